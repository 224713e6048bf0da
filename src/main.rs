fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("tracew=info"))
        .init();
    log::info!("Started tracew v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = tracew::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
