//! Log into the saucedemo test shop with synthesized input.

use std::time::Duration;

use cdp_stealth::input::TypeOptions;
use cdp_stealth::{Browser, BrowserConfig, WaitUntil};
use futures::StreamExt;

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (browser, mut handler) = Browser::connect(BrowserConfig::default()).await?;
    let driver = async_std::task::spawn(async move {
        while handler.next().await.is_some() {}
    });

    let page = browser.new_page().await?;
    page.navigate("https://www.saucedemo.com/").await?;

    let mut input = page.input();
    input
        .type_text("#user-name", "standard_user", TypeOptions::default())
        .await?;
    input
        .type_text("#password", "secret_sauce", TypeOptions::default())
        .await?;
    input.click("#login-button").await?;

    page.wait_for_navigation(WaitUntil::NetworkIdle, Duration::from_secs(30))
        .await?;
    let url = page.get_current_url().await?;
    println!("landed on {url}");
    assert_eq!(url, "https://www.saucedemo.com/inventory.html");

    browser.close().await?;
    driver.await;
    Ok(())
}
