use anyhow::Context;
use lynkui_core::{ServiceConfig, UiService};
use serde::Serialize;
use std::sync::Arc;

async fn open(config: ServiceConfig) -> anyhow::Result<Arc<UiService>> {
    let service = UiService::builder(config)
        .without_watch()
        .without_write_back()
        .start()
        .await?;
    Ok(service)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn dict(config: ServiceConfig, namespaces: Vec<String>) -> anyhow::Result<()> {
    let service = open(config).await?;
    print_json(&service.dict_query(&namespaces).await)
}

pub async fn pagelet(config: ServiceConfig, name: String) -> anyhow::Result<()> {
    let service = open(config).await?;
    let pagelet = service
        .fetch_pagelet(&name)
        .await
        .with_context(|| format!("pagelet ({}) not found", name))?;
    print_json(&pagelet)
}

pub async fn datalet(config: ServiceConfig, name: String) -> anyhow::Result<()> {
    let service = open(config).await?;
    print_json(&service.run_datalet(&name, None).await)
}
