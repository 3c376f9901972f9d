//! staged_image_release - republish staged container images as a release.

use staged_image_release::cli;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    let exit_code = cli::run().await;
    process::exit(exit_code);
}
