//! Capability stub: deterministic stand-in for a live trading environment.
//!
//! Strategy units query prices and indicators and submit orders through this
//! surface. The stub is a pure echo: it never raises, never clamps, and never
//! validates. Whatever a test configures is exactly what the unit reads back,
//! and every command a unit issues is recorded for later inspection.
//!
//! The stub is owned by a single harness run and shared with each unit's
//! sandbox through a [`StubHandle`]. It is reset before every unit
//! instantiation and every scenario application.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::scenario::ScenarioCase;

/// Symbol returned by `declare_trigger_symbol()`.
pub const DEFAULT_SYMBOL: &str = "TEST_SYMBOL";

/// Price reported for a symbol that was never configured.
pub const DEFAULT_PRICE: f64 = 100.0;

/// Moving average reported for an indicator key that was never configured.
pub const DEFAULT_MOVING_AVERAGE: f64 = 100.0;

/// RSI reported for an indicator key that was never configured.
pub const DEFAULT_RSI: f64 = 50.0;

/// Fixed answer of `get_margin_buy_capacity()`.
pub const MARGIN_BUY_CAPACITY: i64 = 10_000;

/// Granularity the scenario values are written under.
pub const SCENARIO_GRANULARITY: &str = "D1";

/// Moving-average periods populated from a scenario case.
pub const SCENARIO_MA_PERIODS: [i64; 5] = [1, 20, 50, 100, 200];

/// RSI period populated from a scenario case.
pub const SCENARIO_RSI_PERIOD: i64 = 14;

const BID_FACTOR: f64 = 0.999;
const ASK_FACTOR: f64 = 1.001;

/// Which indicator an [`IndicatorKey`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    MovingAverage,
    Rsi,
}

/// Lookup key for configured indicator values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndicatorKey {
    pub symbol: String,
    pub kind: IndicatorKind,
    pub period: i64,
    pub granularity: String,
}

impl IndicatorKey {
    pub fn new(symbol: &str, kind: IndicatorKind, period: i64, granularity: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind,
            period,
            granularity: granularity.to_string(),
        }
    }
}

/// A limit order as submitted by a unit. Recorded verbatim, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub symbol: String,
    /// `None` when the unit passed something that is not a number.
    pub price: Option<f64>,
    /// `None` when the unit passed something that is not a number.
    pub quantity: Option<i64>,
    pub side: String,
    pub time_in_force: String,
    pub session: String,
}

/// Simulated environment state.
///
/// Prices and indicators are stored as `Option<f64>` so a scenario can mark a
/// value as explicitly absent; an explicitly absent value is distinct from an
/// unconfigured one, which falls back to the defaults above.
#[derive(Debug, Clone, Default)]
pub struct CapabilityStub {
    prices: HashMap<String, Option<f64>>,
    positions: HashMap<String, i64>,
    indicators: HashMap<IndicatorKey, Option<f64>>,
    orders: Vec<OrderRecord>,
    alerts: Vec<String>,
    declared_kind: Option<String>,
    declared_symbols: Vec<String>,
    tunable_count: usize,
}

impl CapabilityStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state: prices, positions, indicators, orders, alerts and
    /// declarations.
    pub fn reset(&mut self) {
        self.prices.clear();
        self.positions.clear();
        self.indicators.clear();
        self.orders.clear();
        self.alerts.clear();
        self.declared_kind = None;
        self.declared_symbols.clear();
        self.tunable_count = 0;
    }

    // ── Declarations ──

    pub fn declare_strategy_kind(&mut self, kind: &str) {
        self.declared_kind = Some(kind.to_string());
    }

    /// Returns the default symbol, recording it the first time only.
    pub fn declare_trigger_symbol(&mut self) -> String {
        if !self.declared_symbols.iter().any(|s| s == DEFAULT_SYMBOL) {
            self.declared_symbols.push(DEFAULT_SYMBOL.to_string());
        }
        DEFAULT_SYMBOL.to_string()
    }

    /// A user-configurable parameter. Passes the default straight through.
    pub fn register_tunable<T>(&mut self, default: T, _kind: &str) -> T {
        self.tunable_count += 1;
        default
    }

    // ── Queries ──

    pub fn get_price(&self, symbol: &str) -> Option<f64> {
        match self.prices.get(symbol) {
            Some(price) => *price,
            None => Some(DEFAULT_PRICE),
        }
    }

    /// Moving average for `(symbol, period, granularity)`.
    ///
    /// `field`, `offset` and `session` are accepted for surface compatibility
    /// and do not participate in the lookup.
    pub fn get_moving_average(
        &self,
        symbol: &str,
        period: i64,
        granularity: &str,
        _field: &str,
        _offset: i64,
        _session: &str,
    ) -> Option<f64> {
        let key = IndicatorKey::new(symbol, IndicatorKind::MovingAverage, period, granularity);
        match self.indicators.get(&key) {
            Some(value) => *value,
            None => Some(DEFAULT_MOVING_AVERAGE),
        }
    }

    pub fn get_rsi(&self, symbol: &str, period: i64, granularity: &str, _offset: i64) -> Option<f64> {
        let key = IndicatorKey::new(symbol, IndicatorKind::Rsi, period, granularity);
        match self.indicators.get(&key) {
            Some(value) => *value,
            None => Some(DEFAULT_RSI),
        }
    }

    pub fn get_position_qty(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn get_bid(&self, symbol: &str, _level: i64) -> Option<f64> {
        self.get_price(symbol).map(|p| p * BID_FACTOR)
    }

    pub fn get_ask(&self, symbol: &str, _level: i64) -> Option<f64> {
        self.get_price(symbol).map(|p| p * ASK_FACTOR)
    }

    pub fn get_margin_buy_capacity(&self, _symbol: &str, _price: Option<f64>, _order_kind: &str) -> i64 {
        MARGIN_BUY_CAPACITY
    }

    // ── Commands ──

    pub fn submit_limit_order(&mut self, order: OrderRecord) {
        self.orders.push(order);
    }

    pub fn emit_alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }

    // ── Test setters ──

    pub fn set_price(&mut self, symbol: &str, price: Option<f64>) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub fn set_moving_average(&mut self, symbol: &str, period: i64, granularity: &str, value: Option<f64>) {
        let key = IndicatorKey::new(symbol, IndicatorKind::MovingAverage, period, granularity);
        self.indicators.insert(key, value);
    }

    pub fn set_rsi(&mut self, symbol: &str, period: i64, granularity: &str, value: Option<f64>) {
        let key = IndicatorKey::new(symbol, IndicatorKind::Rsi, period, granularity);
        self.indicators.insert(key, value);
    }

    pub fn set_position_qty(&mut self, symbol: &str, qty: i64) {
        self.positions.insert(symbol.to_string(), qty);
    }

    /// Write a scenario case into the stub: price, the moving average for
    /// every period in [`SCENARIO_MA_PERIODS`], and the RSI for
    /// [`SCENARIO_RSI_PERIOD`], all at [`SCENARIO_GRANULARITY`].
    pub fn apply_case(&mut self, symbol: &str, case: &ScenarioCase) {
        self.set_price(symbol, case.price);
        for period in SCENARIO_MA_PERIODS {
            self.set_moving_average(symbol, period, SCENARIO_GRANULARITY, case.moving_average);
        }
        self.set_rsi(symbol, SCENARIO_RSI_PERIOD, SCENARIO_GRANULARITY, case.rsi);
    }

    // ── Recorded side effects ──

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn declared_kind(&self) -> Option<&str> {
        self.declared_kind.as_deref()
    }

    pub fn declared_symbols(&self) -> &[String] {
        &self.declared_symbols
    }

    pub fn tunable_count(&self) -> usize {
        self.tunable_count
    }
}

/// Shared handle to the run's stub.
///
/// Created once per harness run and passed by reference into the loader and
/// executor. Cloning the handle shares the same stub; the sandbox bindings hold
/// clones so script calls reach the state the executor configures.
#[derive(Debug, Clone, Default)]
pub struct StubHandle(Rc<RefCell<CapabilityStub>>);

impl StubHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access. Must not be nested inside a script call.
    pub fn with<R>(&self, f: impl FnOnce(&CapabilityStub) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Write access. Must not be nested inside a script call.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut CapabilityStub) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn reset(&self) {
        self.with_mut(CapabilityStub::reset);
    }

    /// First declared trigger symbol, if the unit declared one.
    pub fn declared_symbol(&self) -> Option<String> {
        self.with(|stub| stub.declared_symbols().first().cloned())
    }
}
