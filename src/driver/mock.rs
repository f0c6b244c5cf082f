//! Mock driver for testing
//!
//! Scripted elements and script responses without a browser. Element handles
//! share state, so a re-located element sees what the previous handle did,
//! and queued faults let tests simulate stale references.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::binding::LocatorStrategy;

use super::{DriverError, WebDriver, WebElement};

/// One `<option>` of a mock dropdown
#[derive(Debug, Clone, PartialEq)]
pub struct MockOption {
    pub value: String,
    pub text: String,
}

#[derive(Debug, Default)]
struct ElementState {
    text: String,
    attributes: HashMap<String, String>,
    selected: bool,
    options: Vec<MockOption>,
    selected_option: Option<usize>,
    keys: String,
    clicks: u32,
    double_clicks: u32,
    submits: u32,
    clears: u32,
    faults: VecDeque<DriverError>,
}

/// Shared handle to a scripted element
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    state: Arc<Mutex<ElementState>>,
}

impl MockElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.state.lock().text = text.into();
        self
    }

    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.state.lock().attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_selected(self, selected: bool) -> Self {
        self.state.lock().selected = selected;
        self
    }

    /// Dropdown options as `(value, text)` pairs
    pub fn with_options(self, options: &[(&str, &str)]) -> Self {
        self.state.lock().options = options
            .iter()
            .map(|(value, text)| MockOption {
                value: value.to_string(),
                text: text.to_string(),
            })
            .collect();
        self
    }

    /// Fail the next interaction with `fault`. Queued faults fire in order.
    pub fn fail_next(&self, fault: DriverError) {
        self.state.lock().faults.push_back(fault);
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.state.lock().text = text.into();
    }

    pub fn keys(&self) -> String {
        self.state.lock().keys.clone()
    }

    pub fn clicks(&self) -> u32 {
        self.state.lock().clicks
    }

    pub fn double_clicks(&self) -> u32 {
        self.state.lock().double_clicks
    }

    pub fn submits(&self) -> u32 {
        self.state.lock().submits
    }

    pub fn clears(&self) -> u32 {
        self.state.lock().clears
    }

    pub fn selected(&self) -> bool {
        self.state.lock().selected
    }

    fn take_fault(&self) -> Result<(), DriverError> {
        match self.state.lock().faults.pop_front() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn select_where(&self, matches: impl Fn(usize, &MockOption) -> bool, what: &str) -> Result<(), DriverError> {
        self.take_fault()?;
        let mut state = self.state.lock();
        let index = state
            .options
            .iter()
            .enumerate()
            .position(|(i, o)| matches(i, o))
            .ok_or_else(|| DriverError::NotFound(format!("option {}", what)))?;
        state.selected_option = Some(index);
        Ok(())
    }
}

#[async_trait]
impl WebElement for MockElement {
    async fn text(&self) -> Result<String, DriverError> {
        self.take_fault()?;
        Ok(self.state.lock().text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.take_fault()?;
        Ok(self.state.lock().attributes.get(name).cloned())
    }

    async fn click(&self) -> Result<(), DriverError> {
        self.take_fault()?;
        let mut state = self.state.lock();
        state.clicks += 1;
        state.selected = !state.selected;
        Ok(())
    }

    async fn double_click(&self) -> Result<(), DriverError> {
        self.take_fault()?;
        self.state.lock().double_clicks += 1;
        Ok(())
    }

    async fn submit(&self) -> Result<(), DriverError> {
        self.take_fault()?;
        self.state.lock().submits += 1;
        Ok(())
    }

    async fn send_keys(&self, keys: &str) -> Result<(), DriverError> {
        self.take_fault()?;
        self.state.lock().keys.push_str(keys);
        Ok(())
    }

    async fn clear(&self) -> Result<(), DriverError> {
        self.take_fault()?;
        let mut state = self.state.lock();
        state.clears += 1;
        state.keys.clear();
        Ok(())
    }

    async fn is_selected(&self) -> Result<bool, DriverError> {
        self.take_fault()?;
        Ok(self.state.lock().selected)
    }

    async fn select_by_text(&self, text: &str) -> Result<(), DriverError> {
        self.select_where(|_, o| o.text == text, text)
    }

    async fn select_by_value(&self, value: &str) -> Result<(), DriverError> {
        self.select_where(|_, o| o.value == value, value)
    }

    async fn select_by_index(&self, index: usize) -> Result<(), DriverError> {
        self.select_where(|i, _| i == index, &index.to_string())
    }

    async fn selected_text(&self) -> Result<String, DriverError> {
        self.take_fault()?;
        let state = self.state.lock();
        Ok(state
            .selected_option
            .and_then(|i| state.options.get(i))
            .map(|o| o.text.clone())
            .unwrap_or_default())
    }
}

/// Mock driver with scripted elements and script responses
#[derive(Debug, Default)]
pub struct MockDriver {
    elements: Mutex<HashMap<String, MockElement>>,
    /// Responses per script; the last response repeats once the queue drains
    scripts: Mutex<HashMap<String, VecDeque<Result<Value, DriverError>>>>,
    locate_faults: Mutex<HashMap<String, VecDeque<DriverError>>>,
    locates: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element under a locator
    pub fn add_element(&self, strategy: LocatorStrategy, expression: &str, element: MockElement) {
        self.elements
            .lock()
            .insert(locator_key(strategy, expression), element);
    }

    /// Fail the next locate for this locator with `fault`
    pub fn fail_next_locate(&self, strategy: LocatorStrategy, expression: &str, fault: DriverError) {
        self.locate_faults
            .lock()
            .entry(locator_key(strategy, expression))
            .or_default()
            .push_back(fault);
    }

    /// Always answer `script` with `value`
    pub fn set_script(&self, script: &str, value: Value) {
        self.script_sequence(script, vec![value]);
    }

    /// Answer `script` with each value in turn, repeating the last one
    pub fn script_sequence(&self, script: &str, values: Vec<Value>) {
        self.scripts
            .lock()
            .insert(normalize_script(script), values.into_iter().map(Ok).collect());
    }

    /// Make `script` raise
    pub fn fail_script(&self, script: &str, message: &str) {
        let mut queue = VecDeque::new();
        queue.push_back(Err(DriverError::Script(message.to_string())));
        self.scripts.lock().insert(normalize_script(script), queue);
    }

    /// Number of locate calls made for a locator
    pub fn locate_count(&self, strategy: LocatorStrategy, expression: &str) -> usize {
        let key = locator_key(strategy, expression);
        self.locates.lock().iter().filter(|k| **k == key).count()
    }

    /// Every script executed, as sent
    pub fn executed_scripts(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl WebDriver for MockDriver {
    async fn locate(
        &self,
        strategy: LocatorStrategy,
        expression: &str,
    ) -> Result<Box<dyn WebElement>, DriverError> {
        let key = locator_key(strategy, expression);
        self.locates.lock().push(key.clone());

        if let Some(fault) = self
            .locate_faults
            .lock()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return Err(fault);
        }

        self.elements
            .lock()
            .get(&key)
            .cloned()
            .map(|e| Box::new(e) as Box<dyn WebElement>)
            .ok_or(DriverError::NotFound(key))
    }

    async fn execute_script(
        &self,
        script: &str,
        element: Option<&dyn WebElement>,
    ) -> Result<Value, DriverError> {
        self.executed.lock().push(script.to_string());

        let mut scripts = self.scripts.lock();
        match scripts.get_mut(&normalize_script(script)) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(DriverError::Script("empty response queue".into()))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(DriverError::Script("empty response queue".into()))),
            None if element.is_some() => Ok(Value::Null),
            None => Err(DriverError::Script(format!("no response for '{}'", script))),
        }
    }
}

fn locator_key(strategy: LocatorStrategy, expression: &str) -> String {
    format!("{}={}", strategy, expression)
}

/// `return (x);` and `x` address the same response
fn normalize_script(script: &str) -> String {
    let trimmed = script.trim().trim_end_matches(';').trim();
    trimmed
        .strip_prefix("return ")
        .map(str::trim)
        .unwrap_or(trimmed)
        .to_string()
}
