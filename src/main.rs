use std::process::ExitCode;

use cleaning_inventory::app::InventoryApp;
use cleaning_inventory::types::InventoryError;

#[tokio::main]
async fn main() -> ExitCode {
    let app = match InventoryApp::from_env() {
        Ok(app) => app,
        Err(InventoryError::Cli(err)) => err.exit(),
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match app.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
