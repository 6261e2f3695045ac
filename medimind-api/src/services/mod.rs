//! Vendor clients, the prescription pipeline and reminder delivery

pub mod email;
pub mod enrichment;
pub mod fcm_client;
pub mod image_quality;
pub mod llm_client;
pub mod notifier;
pub mod ocr_client;
pub mod parser;
pub mod search_client;
pub mod templates;

use anyhow::Context;
use medimind_common::config::{mask_secret, ServiceConfig};
use std::sync::Arc;
use tracing::{info, warn};

use email::{EmailSender, ResendClient};
use enrichment::Enricher;
use fcm_client::{FcmClient, PushSender};
use llm_client::{ChatModel, GroqClient};
use ocr_client::{OcrEngine, OcrSpaceClient};
use search_client::{TavilyClient, WebSearch};

/// External collaborators shared by request handlers and the scheduler
#[derive(Clone)]
pub struct Services {
    pub ocr: Arc<dyn OcrEngine>,
    pub llm: Option<Arc<dyn ChatModel>>,
    pub enricher: Enricher,
    pub email: Arc<dyn EmailSender>,
    pub push: Option<Arc<dyn PushSender>>,
}

impl Services {
    /// Build the production clients; unconfigured optional vendors are left out
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        info!("OCR API key: {}", mask_secret(config.ocr.api_key.as_deref()));
        let ocr: Arc<dyn OcrEngine> = Arc::new(
            OcrSpaceClient::new(config.ocr.endpoint.clone(), config.ocr.api_key.clone())
                .context("Failed to build OCR client")?,
        );

        let llm: Option<Arc<dyn ChatModel>> = match config.llm.api_key.clone() {
            Some(key) => {
                info!(model = %config.llm.model, "LLM parsing enabled");
                Some(Arc::new(
                    GroqClient::new(config.llm.endpoint.clone(), config.llm.model.clone(), key)
                        .context("Failed to build LLM client")?,
                ))
            }
            None => {
                warn!("GROQ_API_KEY not set: prescriptions will not be parsed");
                None
            }
        };

        let search: Option<Arc<dyn WebSearch>> = match config.search.api_key.clone() {
            Some(key) => Some(Arc::new(
                TavilyClient::new(config.search.endpoint.clone(), key)
                    .context("Failed to build search client")?,
            )),
            None => {
                info!("TAVILY_API_KEY not set: enrichment runs without web context");
                None
            }
        };

        let email: Arc<dyn EmailSender> = Arc::new(
            ResendClient::new(config.email.clone()).context("Failed to build email client")?,
        );
        info!(
            enabled = config.email.enabled,
            api_key = %mask_secret(config.email.resend_api_key.as_deref()),
            "Email transport: resend"
        );

        let push: Option<Arc<dyn PushSender>> =
            match FcmClient::from_credentials_file(&config.push.credentials_path) {
                Ok(client) => {
                    info!(project_id = %client.project_id(), "Push notifications enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(
                        "Push notifications disabled ({}). Set FIREBASE_CREDENTIALS_PATH to a service account JSON file to enable.",
                        e
                    );
                    None
                }
            };

        Ok(Self {
            ocr,
            enricher: Enricher::new(llm.clone(), search),
            llm,
            email,
            push,
        })
    }
}
