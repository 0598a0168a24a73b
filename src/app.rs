use std::{path::Path, sync::Arc};

use log::info;

use crate::{
    assets::AssetServer,
    config::Config,
    exception::Exception,
    handler::{DinoHandler, StaticHandler, TemplateHandler},
    param::HttpRequestMethod,
    router::Router,
    template::TemplateStore,
};

pub const HOME_TEMPLATE: &str = "home";
pub const FORM_TEMPLATE: &str = "form";

/// Load templates, open the asset root and register every route.
///
/// Fails only when a template is missing.
pub fn build_router(config: &Config) -> Result<Router, Exception> {
    let templates = Arc::new(TemplateStore::load(
        Path::new(config.template_root()),
        &[HOME_TEMPLATE, FORM_TEMPLATE],
    )?);
    let assets = Arc::new(AssetServer::new(config.asset_root(), config.cache_size()));

    let mut router = Router::new();
    router
        .register(
            HttpRequestMethod::Get,
            "/",
            Arc::new(TemplateHandler::new(templates.clone(), HOME_TEMPLATE)),
        )
        .register(
            HttpRequestMethod::Get,
            "/form",
            Arc::new(TemplateHandler::new(templates, FORM_TEMPLATE)),
        )
        .register(
            HttpRequestMethod::Get,
            "/dino",
            Arc::new(DinoHandler::new(config.escape_user_input())),
        )
        .register(
            HttpRequestMethod::Get,
            "/static/*path",
            Arc::new(StaticHandler::new(assets)),
        );
    info!("{} routes registered", router.len());
    Ok(router)
}
