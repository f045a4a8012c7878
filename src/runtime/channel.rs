use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tracing::trace;

use crate::{
    ForgeError, Result, ShareLock,
    common::{BroadcastQueue, Shutdown},
    events::{Event, Message},
    runtime::RunId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        if let Ok(handlers) = $handles.read() {
            for handle in handlers.iter() {
                (handle)($(&$item),+);
            }
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        tokio::spawn(async move {
            let handlers = match handles.read() {
                Ok(handlers) => handlers.clone(),
                Err(_) => return,
            };
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;

pub type RunEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;
pub type RunEventHandleAsync = Arc<dyn Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the run id
    /// eg. run1*
    pub run_id: String,

    /// use the glob pattern to match the node id
    /// eg. llm_*
    pub node_id: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            run_id: "*".to_string(),
            node_id: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn new(
        run_id: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            node_id: node_id.into(),
        }
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    pub fn with_node_id(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }
}

/// Pub/sub bus for run and node events.
///
/// Publishers call [`Channel::emit`]; subscribers either register handlers
/// through [`ChannelEvent`] (dispatched by the task started in
/// [`Channel::listen`]) or take a raw receiver with [`Channel::subscribe`].
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,

    events: ShareLock<Vec<RunEventHandle>>,
    events_async: ShareLock<Vec<RunEventHandleAsync>>,

    shutdown: Arc<Shutdown>,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    pub fn new() -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Publish `msg` to every subscriber.
    pub fn emit(
        &self,
        msg: Message,
    ) {
        if self.event_queue.send(Event::new(&msg)).is_err() {
            trace!("channel: no subscriber for {:?}", msg.event);
        }
    }

    /// Raw receiver of every message emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event<Message>> {
        self.event_queue.subscribe()
    }

    /// Start dispatching messages to the registered handlers.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();
        let events_async = self.events_async.clone();

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    received = event_queue.recv() => match received {
                        Ok(e) => {
                            let evt = e.clone();
                            dispatch_event!(events, &evt);
                            dispatch_event_async!(events_async, &e);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            trace!("channel: listener lagged, {} message(s) dropped", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    fn push_handle(
        &self,
        handle: RunEventHandle,
    ) {
        if let Ok(mut handles) = self.events.write() {
            handles.push(handle);
        }
    }

    fn push_handle_async(
        &self,
        handle: RunEventHandleAsync,
    ) {
        if let Ok(mut handles) = self.events_async.write() {
            handles.push(handle);
        }
    }
}

/// Handler registration on a [`Channel`], filtered by run and node id globs.
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let matcher = |pattern: &str| {
            globset::Glob::new(pattern).map(|g| g.compile_matcher()).map_err(|e| ForgeError::Config(format!("invalid channel pattern '{}': {}", pattern, e)))
        };

        Ok(Self {
            channel,
            glob: (matcher(&options.run_id)?, matcher(&options.node_id)?),
        })
    }

    /// Called with the run id when a run succeeds.
    pub fn on_complete(
        &self,
        f: impl Fn(RunId) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_handle(Arc::new(move |e| {
            if e.event.is_complete() && is_match(&glob, e) {
                f(e.run_id.clone());
            }
        }));
    }

    /// Called when a run fails.
    pub fn on_error(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_handle(Arc::new(move |e| {
            if e.event.is_error() && is_match(&glob, e) {
                f(e);
            }
        }));
    }

    /// Called with the run id when a run ends, whatever the outcome.
    pub fn on_finish(
        &self,
        f: impl Fn(RunId) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_handle(Arc::new(move |e| {
            if e.event.is_terminal() && is_match(&glob, e) {
                f(e.run_id.clone());
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_handle(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.push_handle_async(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &Event<Message>,
) -> bool {
    let (pat_run, pat_node) = glob;
    pat_run.is_match(&e.run_id) && pat_node.is_match(&e.node_id)
}
