use std::ffi::OsString;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = dashboard_core::run(args).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
