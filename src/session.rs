//! Connection lifecycle and the receive loop.
//!
//! A [`Session`] owns the connection for its whole life: it dials
//! through a [`Connector`], registers, pumps inbound lines through the
//! dispatch table, and reconnects after a fixed pause whenever the
//! transport drops. Handlers and background tasks interact with the
//! session through a cloneable [`SessionHandle`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use corvid_proto::{
    Command, Ctcp, CtcpKind, LineCodec, Message, ProtocolError, RPL_ENDOFWHOIS, RPL_WHOISREGNICK,
};

use crate::config::BotConfig;
use crate::dispatch::{Context, Handler, Registry};
use crate::error::{ClientError, Result};
use crate::identify::{IdentCallback, IdentifyRegistry};
use crate::transport::{BoxedReader, Connector};
use crate::writer::OutputBuffer;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Registered,
    Running,
    Reconnecting,
    Stopped,
}

/// Cheap handle for talking to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    out: Arc<OutputBuffer>,
    idents: Arc<IdentifyRegistry>,
    stop_tx: watch::Sender<bool>,
}

impl SessionHandle {
    /// Send a raw protocol line through the rate limiter.
    pub async fn send_raw(&self, line: impl Into<String>) -> Result<()> {
        self.out.send_buffered(line).await
    }

    /// Say `text` to a channel or nick.
    pub async fn say(&self, target: &str, text: &str) -> Result<()> {
        self.send_raw(Message::privmsg(target, text).to_string()).await
    }

    /// Emote `text` to a channel or nick (third-person action).
    pub async fn action(&self, target: &str, text: &str) -> Result<()> {
        let body = Ctcp::action(text).to_string();
        self.send_raw(Message::privmsg(target, body).to_string()).await
    }

    /// Join a channel.
    pub async fn join(&self, channel: &str) -> Result<()> {
        self.send_raw(Message::join(channel).to_string()).await
    }

    /// Ask the server whether `nick` is verified with services.
    ///
    /// Exactly one of the two callbacks eventually fires: `on_approved`
    /// when the server confirms the nick is registered, `on_rejected`
    /// when the query completes without a confirmation (or expires,
    /// when an identify timeout is configured).
    pub async fn identify(
        &self,
        nick: &str,
        on_approved: IdentCallback,
        on_rejected: IdentCallback,
    ) -> Result<()> {
        self.idents.request(nick, on_approved, on_rejected);
        self.send_raw(Message::whois(nick).to_string()).await
    }

    /// Send a parting message and stop the session.
    pub async fn quit(&self, message: &str) -> Result<()> {
        self.send_raw(Message::quit(message).to_string()).await?;
        self.stop();
        Ok(())
    }

    /// Ask the session to shut down. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

type LineFrames = FramedRead<BoxedReader, LineCodec>;

/// One long-lived client session against one server.
pub struct Session {
    config: BotConfig,
    connector: Box<dyn Connector>,
    registry: Registry,
    out: Arc<OutputBuffer>,
    idents: Arc<IdentifyRegistry>,
    /// Learned from the first inbound message, kept for the session's
    /// whole life so server-origin traffic stays distinguishable from
    /// peer traffic across reconnects.
    server_name: Option<String>,
    state: SessionState,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl Session {
    pub fn new(config: BotConfig, connector: Box<dyn Connector>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let out = Arc::new(OutputBuffer::new(config.send_interval()));
        Self {
            config,
            connector,
            registry: Registry::new(),
            out,
            idents: Arc::new(IdentifyRegistry::default()),
            server_name: None,
            state: SessionState::Disconnected,
            stop_tx,
            stop_rx,
        }
    }

    /// Handle for handlers and external tasks.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            out: Arc::clone(&self.out),
            idents: Arc::clone(&self.idents),
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Bind `handler` to `command` in the dispatch table.
    pub fn bind(&mut self, command: Command, handler: Box<dyn Handler>) {
        self.registry.bind(command, handler);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Short name of the connected server, once learned.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Drive the session until [`SessionHandle::stop`] is called.
    ///
    /// Connection loss never ends the loop; the session pauses for the
    /// configured delay and redials. Queued outbound lines survive the
    /// reconnect.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if *self.stop_rx.borrow() {
                break;
            }
            let mut frames = match self.connect().await {
                Ok(frames) => frames,
                Err(e) => {
                    warn!(error = %e, "connect failed");
                    self.state = SessionState::Reconnecting;
                    if self.pause_before_reconnect().await {
                        break;
                    }
                    continue;
                }
            };
            self.state = SessionState::Running;
            match self.receive_loop(&mut frames).await {
                Ok(()) => break,
                Err(e) => {
                    warn!(error = %e, "connection lost");
                    self.out.detach().await;
                    self.state = SessionState::Reconnecting;
                    if self.pause_before_reconnect().await {
                        break;
                    }
                }
            }
        }
        self.out.detach().await;
        self.state = SessionState::Stopped;
        info!("session stopped");
        Ok(())
    }

    /// Dial, attach the writer, and send the registration sequence.
    async fn connect(&mut self) -> Result<LineFrames> {
        self.state = SessionState::Connecting;
        info!(server = %self.config.address(), nick = %self.config.nick, "connecting");

        let (reader, writer) = self.connector.connect().await?;
        self.out.attach(writer).await;

        self.out
            .send_buffered(Message::nick(&self.config.nick).to_string())
            .await?;
        self.out
            .send_buffered(Message::user(&self.config.nick, &self.config.realname).to_string())
            .await?;

        self.state = SessionState::Registered;
        Ok(FramedRead::new(reader, LineCodec::new()))
    }

    /// Sleep the reconnect delay, cut short by a stop request.
    /// Returns true when the session should stop instead of redialing.
    async fn pause_before_reconnect(&mut self) -> bool {
        if *self.stop_rx.borrow() {
            return true;
        }
        info!(delay_secs = self.config.reconnect_delay().as_secs(), "pausing before reconnect");
        let mut stop_rx = self.stop_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(self.config.reconnect_delay()) => *stop_rx.borrow(),
            _ = stop_rx.changed() => true,
        }
    }

    /// Pump inbound frames until stop (`Ok`) or transport failure (`Err`).
    async fn receive_loop(&mut self, frames: &mut LineFrames) -> Result<()> {
        let mut stop_rx = self.stop_rx.clone();
        if *stop_rx.borrow() {
            return Ok(());
        }

        let timeout = self.config.identify_timeout();
        // With no timeout configured the sweep still ticks, harmlessly
        let mut sweep = tokio::time::interval(timeout.unwrap_or(Duration::from_secs(3600)));
        sweep.tick().await;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        return Ok(());
                    }
                }
                _ = sweep.tick() => {
                    if let Some(max_age) = timeout {
                        let expired = self.idents.expire(max_age);
                        if !expired.is_empty() {
                            info!(count = expired.len(), "expiring unanswered identity queries");
                        }
                        for cb in expired {
                            cb().await;
                        }
                    }
                }
                frame = frames.next() => match frame {
                    Some(Ok(line)) => {
                        if line.is_empty() {
                            continue;
                        }
                        self.process_line(&line).await?;
                    }
                    Some(Err(ProtocolError::Io(e))) => return Err(e.into()),
                    Some(Err(e)) => debug!(error = %e, "discarding malformed line"),
                    None => return Err(ClientError::ConnectionClosed),
                },
            }
        }
    }

    async fn process_line(&mut self, line: &str) -> Result<()> {
        // Keep-alive replies skip parsing and the rate limiter; the
        // token is echoed back exactly as received
        if line.starts_with("PING") {
            if let Some(token) = line.split_whitespace().nth(1) {
                self.out.send_immediate(format!("PONG {token}")).await?;
            }
            return Ok(());
        }

        let mut msg: Message = match line.parse() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "discarding unparseable line");
                return Ok(());
            }
        };

        if self.server_name.is_none() {
            self.server_name = Some(msg.sender().to_owned());
            debug!(server = %msg.sender(), "learned server name");
        }

        let from_server = self.server_name.as_deref() == Some(msg.sender());

        // Peer-origin emotes arrive as PRIVMSG wrapping a CTCP ACTION;
        // surface them as their own command with the envelope stripped
        if msg.command == Command::Privmsg && !from_server {
            if let Some(ctcp) = msg.trailing.as_deref().and_then(Ctcp::parse) {
                if ctcp.kind == CtcpKind::Action {
                    msg.command = Command::Action;
                    msg.trailing = Some(ctcp.params.unwrap_or_default());
                }
            }
        }

        // Only the server's own numerics carry identity authority
        match msg.command {
            Command::Numeric(RPL_WHOISREGNICK) if from_server && msg.params.len() >= 2 => {
                let nick = msg.params[1].clone();
                let approved = self.idents.resolve_approved(&nick);
                if !approved.is_empty() {
                    info!(nick = %nick, "nick verified");
                }
                for cb in approved {
                    cb().await;
                }
            }
            Command::Numeric(RPL_ENDOFWHOIS) if from_server && msg.params.len() >= 2 => {
                let nick = msg.params[1].clone();
                let rejected = self.idents.resolve_rejected(&nick);
                if !rejected.is_empty() {
                    info!(nick = %nick, "nick could not be verified");
                }
                for cb in rejected {
                    cb().await;
                }
            }
            _ => {}
        }

        let handle = self.handle();
        let mut ctx = Context {
            sender: msg.sender(),
            params: &msg.params,
            trailing: msg.trailing.as_deref().unwrap_or(""),
            session: &handle,
        };
        if let Err(e) = self.registry.dispatch(&msg.command, &mut ctx).await {
            warn!(command = %msg.command, error = %e, "handler failed");
        }
        Ok(())
    }
}
