// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # Event Listeners
//!
//! Fan-out of [`AlgorithmEvent`]s to observers. Observers implement
//! [`EventSink`] and are registered on the running instance; delivery is
//! synchronous and in registration order. [`ChannelSink`] bridges the
//! stream onto an `mpsc` channel for observers living on other threads, and
//! [`TracingSink`] mirrors it into the `tracing` output.

use crate::event::AlgorithmEvent;
use std::sync::mpsc;

/// An observer of the event stream.
pub trait EventSink<S, A> {
    /// Called once per emitted event.
    fn on_event(&self, event: &AlgorithmEvent<S, A>);
}

/// The registered observers of one instance.
pub struct ListenerSet<S, A> {
    sinks: Vec<Box<dyn EventSink<S, A> + Send>>,
}

impl<S, A> ListenerSet<S, A> {
    /// An empty set.
    pub fn new() -> Self {
        ListenerSet { sinks: Vec::new() }
    }

    /// Registers an observer. Observers cannot be removed; drop the
    /// receiving end instead.
    pub fn register(&mut self, sink: impl EventSink<S, A> + Send + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Delivers `event` to every observer, in registration order.
    pub fn broadcast(&self, event: &AlgorithmEvent<S, A>) {
        for sink in &self.sinks {
            sink.on_event(event);
        }
    }

    /// Number of registered observers.
    #[inline]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// `true` if nobody is listening.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl<S, A> Default for ListenerSet<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> std::fmt::Debug for ListenerSet<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Forwards events onto an `mpsc` channel.
///
/// A hung-up receiver is tolerated; events are then dropped silently.
#[derive(Debug)]
pub struct ChannelSink<S, A> {
    sender: mpsc::Sender<AlgorithmEvent<S, A>>,
}

impl<S, A> ChannelSink<S, A> {
    /// Creates a sink and the receiver it feeds.
    pub fn channel() -> (Self, mpsc::Receiver<AlgorithmEvent<S, A>>) {
        let (sender, receiver) = mpsc::channel();
        (ChannelSink { sender }, receiver)
    }

    /// Wraps an existing sender.
    pub fn from_sender(sender: mpsc::Sender<AlgorithmEvent<S, A>>) -> Self {
        ChannelSink { sender }
    }
}

impl<S, A> EventSink<S, A> for ChannelSink<S, A>
where
    S: Clone,
    A: Clone,
{
    fn on_event(&self, event: &AlgorithmEvent<S, A>) {
        let _ = self.sender.send(event.clone());
    }
}

/// Mirrors the event stream into `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl<S, A> EventSink<S, A> for TracingSink {
    fn on_event(&self, event: &AlgorithmEvent<S, A>) {
        tracing::info!(event = %event, "search event");
    }
}
