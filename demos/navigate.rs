//! Navigate to a url, print the title and optionally save a screenshot.
//!
//! ```
//! cargo run --example navigate -- https://example.com [host] [port] [screenshot.png]
//! ```

use cdp_stealth::cdp::page::CaptureScreenshotParams;
use cdp_stealth::{Browser, BrowserConfig};
use futures::StreamExt;

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://example.com".to_string());
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port: u16 = args.next().as_deref().unwrap_or("9222").parse()?;
    let screenshot = args.next();

    let (browser, mut handler) = Browser::connect(BrowserConfig::new(host, port)).await?;
    let driver = async_std::task::spawn(async move {
        while handler.next().await.is_some() {}
    });

    let page = browser.new_page().await?;
    page.navigate(&url).await?;
    println!("title: {}", page.get_title().await?);
    println!("url:   {}", page.get_current_url().await?);

    if let Some(path) = screenshot {
        page.save_screenshot(CaptureScreenshotParams::png(), &path)
            .await?;
        println!("screenshot saved to {path}");
    }

    browser.close().await?;
    driver.await;
    Ok(())
}
