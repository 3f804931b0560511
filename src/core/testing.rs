//! Scripted test doubles for the generation-service and credential
//! boundaries. Responses are queued up front and consumed in call order, so
//! tests can replay exact failure sequences without timers or network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;

use crate::core::comic::{GenerationRequest, PanelImage, PanelScript};
use crate::core::gemini::GenerationClient;
use crate::core::orchestrator::CredentialReselector;

enum ImageReply {
    Ok,
    Empty,
    Err(String),
}

enum ScriptReply {
    Ok(usize),
    Err(String),
}

pub struct MockClient {
    scripts: Mutex<VecDeque<ScriptReply>>,
    images: Mutex<VecDeque<ImageReply>>,
    image_calls: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            images: Mutex::new(VecDeque::new()),
            image_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful script result with `n` panels.
    pub fn push_script_ok(&self, n: usize) {
        self.scripts.lock().unwrap().push_back(ScriptReply::Ok(n));
    }

    pub fn push_script_err(&self, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(ScriptReply::Err(message.to_string()));
    }

    pub fn push_image_ok(&self) {
        self.images.lock().unwrap().push_back(ImageReply::Ok);
    }

    /// Queue a "successful" call whose image payload is zero bytes.
    pub fn push_image_empty(&self) {
        self.images.lock().unwrap().push_back(ImageReply::Empty);
    }

    pub fn push_image_err(&self, message: &str) {
        self.images
            .lock()
            .unwrap()
            .push_back(ImageReply::Err(message.to_string()));
    }

    /// Descriptions passed to `synthesize_image`, in call order.
    pub fn image_descriptions(&self) -> Vec<String> {
        self.image_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for MockClient {
    async fn synthesize_script(&self, _request: &GenerationRequest) -> Result<Vec<PanelScript>> {
        // Yield so snapshot observers get a chance to run between phases.
        tokio::task::yield_now().await;
        let reply = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected script call");
        match reply {
            ScriptReply::Ok(n) => Ok((1..=n)
                .map(|i| PanelScript {
                    index: i,
                    description: format!("scene {i}"),
                    caption: format!("caption {i}"),
                })
                .collect()),
            ScriptReply::Err(message) => Err(anyhow!(message)),
        }
    }

    async fn synthesize_image(
        &self,
        _request: &GenerationRequest,
        description: &str,
    ) -> Result<PanelImage> {
        tokio::task::yield_now().await;
        self.image_calls
            .lock()
            .unwrap()
            .push(description.to_string());
        let reply = self
            .images
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected image call");
        match reply {
            ImageReply::Ok => Ok(PanelImage {
                mime_type: "image/png".to_string(),
                data: Bytes::from_static(b"png-bytes"),
            }),
            ImageReply::Empty => Ok(PanelImage {
                mime_type: "image/png".to_string(),
                data: Bytes::new(),
            }),
            ImageReply::Err(message) => Err(anyhow!(message)),
        }
    }
}

pub struct MockReselector {
    called: AtomicUsize,
}

impl MockReselector {
    pub fn new() -> Self {
        Self {
            called: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialReselector for MockReselector {
    async fn reselect(&self) -> Result<()> {
        self.called.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
