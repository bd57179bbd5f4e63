//! Create a maximum-stealth page and print the fingerprint surface a
//! detector would probe.

use cdp_stealth::{Browser, BrowserConfig, StealthLevel, StealthProfile};
use futures::StreamExt;

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let profile = StealthProfile::builder()
        .level(StealthLevel::Maximum)
        .build()?;
    let config = BrowserConfig::default().with_stealth(profile);

    let (browser, mut handler) = Browser::connect(config).await?;
    let driver = async_std::task::spawn(async move {
        while handler.next().await.is_some() {}
    });

    let page = browser.new_page().await?;
    let snapshot = page
        .evaluate(
            "(() => ({
                webdriver: navigator.webdriver,
                chrome: typeof window.chrome,
                chromeRuntime: window.chrome ? typeof window.chrome.runtime : 'missing',
                vendor: navigator.vendor,
                platform: navigator.platform,
                languages: navigator.languages,
                plugins: navigator.plugins.length,
                userAgent: navigator.userAgent
            }))()",
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    browser.close().await?;
    driver.await;
    Ok(())
}
