use std::sync::Arc;

use rcb_core::{config::Config, fetch::HttpFetcher, ports::AttachmentFetcher, ports::PrinterSink};
use rcb_escpos::EscPosPrinter;

#[tokio::main]
async fn main() -> Result<(), rcb_core::Error> {
    rcb_core::logging::init("rcb")?;

    let cfg = Arc::new(Config::load()?);

    let http: Arc<dyn AttachmentFetcher> = Arc::new(HttpFetcher::new(cfg.fetch_timeout)?);
    let printer = EscPosPrinter::from_config(&cfg);
    tracing::info!(
        device = ?printer.target(),
        profile = %cfg.printer_profile,
        max_dimension = cfg.printer_max_dimension,
        "printer configured"
    );
    let printer: Arc<dyn PrinterSink> = Arc::new(printer);

    rcb_telegram::router::run_polling(cfg, http, printer)
        .await
        .map_err(|e| rcb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
