//! # Media Validation Layer
//!
//! Filters `<object-id>/<password>` transactions by the metadata of the
//! referenced media object.
//!
//! For each `check_tx`/`deliver_tx`:
//!
//! 1. Parse the transaction; malformed → reject.
//! 2. Resolve the object's metadata via [`MetadataResolver`]; failure → reject
//!    with the resolver's message as log.
//! 3. Run every validator; any `false` → reject.
//! 4. Issue a [`ValidationEvent`] (non-blocking, dropped when the channel is
//!    full) and delegate to the wrapped application.
//!
//! The resolver reaches an external object store, which makes this the one
//! layer whose outcome is not a pure function of the transaction bytes.

use crate::domain::errors::LayerResult;
use crate::domain::media::{parse_media_tx, MediaMeta};
use crate::domain::types::{
    RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx, ResponseCommit,
    ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain, CODE_FAILED,
};
use crate::ports::inbound::Application;
use crate::ports::outbound::MetadataResolver;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Decides whether a media object is acceptable.
pub type Validator = Box<dyn Fn(&MediaMeta) -> bool + Send + Sync>;

/// A transaction that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEvent {
    pub meta: MediaMeta,
    pub object_id: String,
    pub password: Vec<u8>,
    /// `true` when raised from `check_tx`, i.e. the tx is not (yet) in a block.
    pub phantom: bool,
}

/// Application layer validating media transactions.
pub struct ValidationLayer<A: Application, R: MetadataResolver> {
    app: A,
    resolver: R,
    validators: Vec<Validator>,
    events: Option<mpsc::Sender<ValidationEvent>>,
}

impl<A: Application, R: MetadataResolver> ValidationLayer<A, R> {
    pub fn new(app: A, resolver: R) -> Self {
        Self {
            app,
            resolver,
            validators: Vec::new(),
            events: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Send accepted transactions to `events` for asynchronous processing.
    pub fn with_events(mut self, events: mpsc::Sender<ValidationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn inner(&self) -> &A {
        &self.app
    }

    /// `Err(log)` when the transaction must be rejected.
    fn process_tx(&self, tx: &[u8], phantom: bool) -> Result<(), String> {
        let parsed = parse_media_tx(tx).ok_or_else(String::new)?;

        let meta = self
            .resolver
            .resolve(&parsed.object_id, parsed.password)
            .map_err(|e| e.to_string())?;

        if !self.validators.iter().all(|validate| validate(&meta)) {
            return Err(String::new());
        }

        self.issue(ValidationEvent {
            meta,
            object_id: parsed.object_id.into_owned(),
            password: parsed.password.to_vec(),
            phantom,
        });
        Ok(())
    }

    fn issue(&self, event: ValidationEvent) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(e) = events.try_send(event) {
            warn!("[validation] dropped event: {}", e);
        }
    }
}

impl<A: Application, R: MetadataResolver> Application for ValidationLayer<A, R> {
    fn start(&self) -> LayerResult<()> {
        self.app.start()
    }

    fn info(&self, request: &RequestInfo) -> LayerResult<ResponseInfo> {
        self.app.info(request)
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        self.app.init_chain(request)
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        if let Err(log) = self.process_tx(tx, true) {
            debug!("[validation] check_tx rejected: {}", log);
            return Ok(ResponseCheckTx::rejected(CODE_FAILED, log));
        }
        self.app.check_tx(tx)
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        if let Err(log) = self.process_tx(tx, false) {
            debug!("[validation] deliver_tx rejected: {}", log);
            return Ok(ResponseDeliverTx::rejected(CODE_FAILED, log));
        }
        self.app.deliver_tx(tx)
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        self.app.end_block(request)
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        self.app.commit()
    }
}
