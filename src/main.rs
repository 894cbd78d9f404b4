use sftpush_lib::{config::RawConfig, logging, run};

#[tokio::main]
async fn main() {
    logging::init();
    let code = run(RawConfig::from_env()).await;
    std::process::exit(code);
}
