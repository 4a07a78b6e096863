// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Background notification Modul
//!
//! Keeps a persistent notification visible while a listener with a background
//! mode is active, showing the title and message configured on the manager.

use common::{notification::NotificationText, request::ActiveListener};
use module_core::{EventKind, Module, ModuleCtx};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// The platform part that actually displays the notification.
pub trait NotificationPresenter: Send {
    /// Shows the notification or replaces the visible one.
    fn show(&mut self, listener: &ActiveListener, text: &NotificationText);

    /// Removes the notification.
    fn clear(&mut self);
}

/// Presenter for headless systems, the notification is written to the log.
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl NotificationPresenter for TracingPresenter {
    fn show(&mut self, listener: &ActiveListener, text: &NotificationText) {
        info!(
            "[{} session {}] {}: {}",
            listener.background_mode, listener.session, text.title, text.message
        );
    }

    fn clear(&mut self) {
        info!("Background location notification removed");
    }
}

pub struct BackgroundNotification<P: NotificationPresenter> {
    ctx: ModuleCtx,
    presenter: P,
    text: NotificationText,
    shown_for: Option<ActiveListener>,
}

impl<P: NotificationPresenter> BackgroundNotification<P> {
    pub fn new(ctx: ModuleCtx, presenter: P) -> Self {
        BackgroundNotification::with_text(ctx, presenter, NotificationText::default())
    }

    /// Creates the module with the text that is current when the module starts.
    pub fn with_text(ctx: ModuleCtx, presenter: P, text: NotificationText) -> Self {
        BackgroundNotification {
            ctx,
            presenter,
            text,
            shown_for: None,
        }
    }

    fn on_listener_started(&mut self, listener: ActiveListener) {
        if !listener.background_mode.is_background() {
            debug!(
                "Listener session {} runs in foreground, no notification",
                listener.session
            );
            return;
        }
        self.presenter.show(&listener, &self.text);
        self.shown_for = Some(listener);
    }

    fn on_listener_stopped(&mut self, listener: ActiveListener) {
        if self
            .shown_for
            .is_some_and(|shown| shown.session == listener.session)
        {
            self.clear();
        }
    }

    fn on_text_changed(&mut self, text: &NotificationText) {
        self.text = text.clone();
        if let Some(listener) = self.shown_for {
            self.presenter.show(&listener, &self.text);
        }
    }

    fn clear(&mut self) {
        if self.shown_for.take().is_some() {
            self.presenter.clear();
        }
    }
}

#[async_trait::async_trait]
impl<P: NotificationPresenter> Module for BackgroundNotification<P> {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => break,
                    EventKind::ListenerStartedEvent(listener) => {
                        self.on_listener_started(listener)
                    }
                    EventKind::ListenerStoppedEvent(listener) => {
                        self.on_listener_stopped(listener)
                    }
                    EventKind::NotificationChangedEvent(text) => self.on_text_changed(&text),
                    _ => (),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Notification module skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        self.clear();
        Ok(())
    }
}
