//! Scripted in-memory resource client for tests
//!
//! Serves objects from an in-memory store, optionally overridden by queued
//! per-target responses, and records every call so tests can assert on the
//! exact sequence of client interactions.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{ApplyOptions, DeleteOptions, Propagation, ResourceClient};
use crate::error::{ClientError, ClientResult};
use crate::resource::{ResourceRef, Unstructured};

/// One recorded client interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Get(String),
    List(String),
    Apply {
        target: String,
        force: bool,
        object: Unstructured,
    },
    Delete {
        target: String,
        propagation: Option<Propagation>,
    },
    Patch {
        target: String,
        body: Vec<u8>,
    },
    Health(String),
    NodeStatus(Vec<String>),
}

#[derive(Default)]
struct MockState {
    objects: HashMap<String, Unstructured>,
    queued_gets: HashMap<String, VecDeque<ClientResult<Unstructured>>>,
    delete_errors: HashMap<String, VecDeque<ClientError>>,
    node_polls: VecDeque<ClientResult<HashMap<String, bool>>>,
    health_failures_remaining: usize,
    keep_objects_on_delete: bool,
    calls: Vec<MockCall>,
}

/// In-memory [`ResourceClient`] double.
#[derive(Default)]
pub struct MockResourceClient {
    state: Mutex<MockState>,
}

fn key(target: &ResourceRef) -> String {
    match &target.namespace {
        Some(ns) => format!("{}/{}/{}", target.resource, ns, target.name),
        None => format!("{}/{}", target.resource, target.name),
    }
}

fn listing_prefix(target: &ResourceRef) -> String {
    match &target.namespace {
        Some(ns) => format!("{}/{}/", target.resource, ns),
        None => format!("{}/", target.resource),
    }
}

fn not_found(target: &ResourceRef) -> ClientError {
    ClientError::NotFound {
        resource: target.resource.clone(),
        name: target.name.clone(),
    }
}

impl MockResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, addressable by the given ref.
    pub fn insert(&self, target: &ResourceRef, object: Unstructured) {
        let mut state = self.state.lock().expect("mock state");
        state.objects.insert(key(target), object);
    }

    /// Queue a one-shot response for `get` on the given ref. Queued
    /// responses are served before the object store and consumed in order.
    pub fn queue_get(&self, target: &ResourceRef, response: ClientResult<Unstructured>) {
        let mut state = self.state.lock().expect("mock state");
        state
            .queued_gets
            .entry(key(target))
            .or_default()
            .push_back(response);
    }

    /// Queue an error for the next `delete` on the given ref.
    pub fn queue_delete_error(&self, target: &ResourceRef, error: ClientError) {
        let mut state = self.state.lock().expect("mock state");
        state
            .delete_errors
            .entry(key(target))
            .or_default()
            .push_back(error);
    }

    /// Queue one node-status poll result. The last queued result repeats
    /// once the queue would otherwise run dry.
    pub fn queue_node_poll(&self, result: ClientResult<HashMap<String, bool>>) {
        let mut state = self.state.lock().expect("mock state");
        state.node_polls.push_back(result);
    }

    /// Fail the next `count` health probes before succeeding.
    pub fn fail_health_probes(&self, count: usize) {
        let mut state = self.state.lock().expect("mock state");
        state.health_failures_remaining = count;
    }

    /// Keep objects fetchable after a successful delete (for exercising
    /// deletion-confirmation timeouts).
    pub fn keep_objects_on_delete(&self) {
        let mut state = self.state.lock().expect("mock state");
        state.keep_objects_on_delete = true;
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().expect("mock state").calls.clone()
    }

    /// The recorded apply calls, in order.
    pub fn applies(&self) -> Vec<(String, bool, Unstructured)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Apply {
                    target,
                    force,
                    object,
                } => Some((target, force, object)),
                _ => None,
            })
            .collect()
    }

    /// Count of recorded deletes.
    pub fn delete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Delete { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.state.lock().expect("mock state").calls.push(call);
    }
}

#[async_trait]
impl ResourceClient for MockResourceClient {
    async fn get(&self, target: &ResourceRef) -> ClientResult<Unstructured> {
        let mut state = self.state.lock().expect("mock state");
        let k = key(target);
        state.calls.push(MockCall::Get(k.clone()));

        if let Some(queue) = state.queued_gets.get_mut(&k)
            && let Some(response) = queue.pop_front()
        {
            return response;
        }
        match state.objects.get(&k) {
            Some(object) => Ok(object.clone()),
            None => Err(not_found(target)),
        }
    }

    async fn list(&self, target: &ResourceRef) -> ClientResult<Vec<Unstructured>> {
        let mut state = self.state.lock().expect("mock state");
        let prefix = listing_prefix(target);
        state.calls.push(MockCall::List(prefix.clone()));

        let mut items: Vec<(String, Unstructured)> = state
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items.into_iter().map(|(_, v)| v).collect())
    }

    async fn apply(
        &self,
        target: &ResourceRef,
        object: &Unstructured,
        options: &ApplyOptions,
    ) -> ClientResult<Unstructured> {
        let mut state = self.state.lock().expect("mock state");
        let k = key(target);
        state.calls.push(MockCall::Apply {
            target: k.clone(),
            force: options.force,
            object: object.clone(),
        });
        state.objects.insert(k, object.clone());
        Ok(object.clone())
    }

    async fn delete(&self, target: &ResourceRef, options: &DeleteOptions) -> ClientResult<()> {
        let mut state = self.state.lock().expect("mock state");
        let k = key(target);
        state.calls.push(MockCall::Delete {
            target: k.clone(),
            propagation: options.propagation,
        });

        if let Some(queue) = state.delete_errors.get_mut(&k)
            && let Some(error) = queue.pop_front()
        {
            return Err(error);
        }
        if !state.objects.contains_key(&k) {
            return Err(not_found(target));
        }
        if !state.keep_objects_on_delete {
            state.objects.remove(&k);
        }
        Ok(())
    }

    async fn patch(
        &self,
        target: &ResourceRef,
        patch: &[u8],
        _field_manager: &str,
    ) -> ClientResult<Unstructured> {
        let mut state = self.state.lock().expect("mock state");
        let k = key(target);
        state.calls.push(MockCall::Patch {
            target: k.clone(),
            body: patch.to_vec(),
        });
        match state.objects.get(&k) {
            Some(object) => Ok(object.clone()),
            None => Err(not_found(target)),
        }
    }

    async fn check_health(&self, endpoint: &str) -> ClientResult<()> {
        let mut state = self.state.lock().expect("mock state");
        state.calls.push(MockCall::Health(endpoint.to_string()));
        if state.health_failures_remaining > 0 {
            state.health_failures_remaining -= 1;
            return Err(ClientError::Probe("connection refused".into()));
        }
        Ok(())
    }

    async fn node_ready_status(&self, names: &[String]) -> ClientResult<HashMap<String, bool>> {
        let mut state = self.state.lock().expect("mock state");
        state.calls.push(MockCall::NodeStatus(names.to_vec()));
        // A final Ok repeats on every further poll; errors are one-shot.
        let repeat_last =
            state.node_polls.len() == 1 && state.node_polls.front().is_some_and(|r| r.is_ok());
        if repeat_last && let Some(Ok(map)) = state.node_polls.front() {
            return Ok(map.clone());
        }
        state
            .node_polls
            .pop_front()
            .unwrap_or_else(|| Ok(HashMap::new()))
    }
}
