use sigproxy::run_cli;

#[tokio::main]
async fn main() {
    let code = match run_cli().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sigproxy: {e:#}");
            1
        }
    };

    // The relay task is never joined; exiting tears it down.
    std::process::exit(code);
}
