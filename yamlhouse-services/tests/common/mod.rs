//! Scripted HTTP client for adapter tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use yamlhouse_services::{Auth, HttpClient, HttpResponse, TransportError};

pub const BASE: &str = "https://api.test";

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub authorization: String,
}

#[derive(Default)]
struct State {
    routes: HashMap<String, VecDeque<HttpResponse>>,
    calls: Vec<Call>,
}

/// Responses are queued per URL and served in order; an unknown URL is a 404.
#[derive(Clone, Default)]
pub struct ScriptedHttp {
    state: Rc<RefCell<State>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(&self, endpoint: &str, body: Value) -> &Self {
        self.respond(endpoint, 200, body.to_string())
    }

    pub fn status(&self, endpoint: &str, status: u16) -> &Self {
        self.respond(endpoint, status, String::new())
    }

    fn respond(&self, endpoint: &str, status: u16, body: String) -> &Self {
        self.state
            .borrow_mut()
            .routes
            .entry(format!("{BASE}{endpoint}"))
            .or_default()
            .push_back(HttpResponse { status, body });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn boxed(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}

impl HttpClient for ScriptedHttp {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call {
            url: url.to_owned(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
            authorization: auth.header_value(),
        });
        Ok(state
            .routes
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(HttpResponse {
                status: 404,
                body: String::new(),
            }))
    }
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
