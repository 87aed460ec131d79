//! Script bindings for the capability stub.
//!
//! Binds the stub's operations and the capability-marker namespaces into a
//! unit's engine as ambient names. Every argument is accepted as a loosely
//! typed value so the surface itself never raises: non-numeric periods read
//! as 0, non-string symbols are stringified, absent numbers come back as `()`.

use rhai::{Dynamic, Engine, Module};

use crate::stub::{OrderRecord, StubHandle};

/// Enum-like marker namespaces. Each constant's value is its own name.
pub const CAPABILITY_MARKERS: &[(&str, &[&str])] = &[
    ("StrategyKind", &["SECURITY"]),
    ("TunableKind", &["INT", "FLOAT", "STRING"]),
    ("Session", &["ALL", "RTH", "ETH"]),
    ("BarType", &["D1", "H1", "M1"]),
    ("DataField", &["CLOSE", "OPEN", "HIGH", "LOW", "VOLUME"]),
    ("OrderSide", &["BUY", "SELL"]),
    ("TimeInForce", &["DAY", "GTC", "IOC", "FOK"]),
    ("TradeSession", &["RTH", "ETH"]),
    ("OrderKind", &["LMT", "MKT"]),
];

/// Names of the script-visible stub operations.
pub const STUB_OPERATIONS: &[&str] = &[
    "declare_strategy_kind",
    "declare_trigger_symbol",
    "register_tunable",
    "get_price",
    "get_moving_average",
    "get_rsi",
    "get_position_qty",
    "get_bid",
    "get_ask",
    "get_margin_buy_capacity",
    "submit_limit_order",
    "emit_alert",
];

/// Bar offset used when a unit omits it.
const DEFAULT_OFFSET: i64 = 1;

/// Order-book level used when a unit omits it.
const DEFAULT_BOOK_LEVEL: i64 = 1;

fn text_of(value: &Dynamic) -> String {
    match value.clone().into_string() {
        Ok(s) => s,
        Err(_) => value.to_string(),
    }
}

fn number_of(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

fn int_of(value: &Dynamic) -> i64 {
    value
        .as_int()
        .ok()
        .or_else(|| value.as_float().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        .unwrap_or(0)
}

fn to_dynamic(value: Option<f64>) -> Dynamic {
    value.map_or(Dynamic::UNIT, Dynamic::from_float)
}

fn moving_average(
    stub: &StubHandle,
    symbol: &Dynamic,
    period: &Dynamic,
    granularity: &Dynamic,
    field: &Dynamic,
    offset: &Dynamic,
    session: &Dynamic,
) -> Dynamic {
    to_dynamic(stub.with(|stub| {
        stub.get_moving_average(
            &text_of(symbol),
            int_of(period),
            &text_of(granularity),
            &text_of(field),
            int_of(offset),
            &text_of(session),
        )
    }))
}

/// Register the marker namespaces (`BarType::D1`, `OrderSide::BUY`, ...).
pub fn bind_markers(engine: &mut Engine) {
    for (namespace, members) in CAPABILITY_MARKERS {
        let mut module = Module::new();
        for member in *members {
            module.set_var(*member, member.to_string());
        }
        engine.register_static_module(*namespace, module.into());
    }
}

/// Register every stub operation, each holding a clone of `stub`.
pub fn bind_stub(engine: &mut Engine, stub: &StubHandle) {
    // ── Declarations ──

    let s = stub.clone();
    engine.register_fn("declare_strategy_kind", move |kind: Dynamic| {
        s.with_mut(|stub| stub.declare_strategy_kind(&text_of(&kind)));
    });

    let s = stub.clone();
    engine.register_fn("declare_trigger_symbol", move || -> String {
        s.with_mut(|stub| stub.declare_trigger_symbol())
    });

    let s = stub.clone();
    engine.register_fn("register_tunable", move |default: Dynamic, kind: Dynamic| -> Dynamic {
        s.with_mut(|stub| stub.register_tunable(default, &text_of(&kind)))
    });

    // ── Queries ──

    let s = stub.clone();
    engine.register_fn("get_price", move |symbol: Dynamic| -> Dynamic {
        to_dynamic(s.with(|stub| stub.get_price(&text_of(&symbol))))
    });

    // Trailing arguments are optional: field (none), offset (1), session (none)
    let s = stub.clone();
    engine.register_fn(
        "get_moving_average",
        move |symbol: Dynamic, period: Dynamic, granularity: Dynamic| -> Dynamic {
            moving_average(&s, &symbol, &period, &granularity, &Dynamic::UNIT, &Dynamic::from_int(DEFAULT_OFFSET), &Dynamic::UNIT)
        },
    );

    let s = stub.clone();
    engine.register_fn(
        "get_moving_average",
        move |symbol: Dynamic, period: Dynamic, granularity: Dynamic, field: Dynamic| -> Dynamic {
            moving_average(&s, &symbol, &period, &granularity, &field, &Dynamic::from_int(DEFAULT_OFFSET), &Dynamic::UNIT)
        },
    );

    let s = stub.clone();
    engine.register_fn(
        "get_moving_average",
        move |symbol: Dynamic, period: Dynamic, granularity: Dynamic, field: Dynamic, offset: Dynamic| -> Dynamic {
            moving_average(&s, &symbol, &period, &granularity, &field, &offset, &Dynamic::UNIT)
        },
    );

    let s = stub.clone();
    engine.register_fn(
        "get_moving_average",
        move |symbol: Dynamic,
              period: Dynamic,
              granularity: Dynamic,
              field: Dynamic,
              offset: Dynamic,
              session: Dynamic|
              -> Dynamic { moving_average(&s, &symbol, &period, &granularity, &field, &offset, &session) },
    );

    let s = stub.clone();
    engine.register_fn(
        "get_rsi",
        move |symbol: Dynamic, period: Dynamic, granularity: Dynamic| -> Dynamic {
            to_dynamic(s.with(|stub| {
                stub.get_rsi(&text_of(&symbol), int_of(&period), &text_of(&granularity), DEFAULT_OFFSET)
            }))
        },
    );

    let s = stub.clone();
    engine.register_fn(
        "get_rsi",
        move |symbol: Dynamic, period: Dynamic, granularity: Dynamic, offset: Dynamic| -> Dynamic {
            to_dynamic(s.with(|stub| {
                stub.get_rsi(&text_of(&symbol), int_of(&period), &text_of(&granularity), int_of(&offset))
            }))
        },
    );

    let s = stub.clone();
    engine.register_fn("get_position_qty", move |symbol: Dynamic| -> i64 {
        s.with(|stub| stub.get_position_qty(&text_of(&symbol)))
    });

    // Book level defaults to 1
    let s = stub.clone();
    engine.register_fn("get_bid", move |symbol: Dynamic| -> Dynamic {
        to_dynamic(s.with(|stub| stub.get_bid(&text_of(&symbol), DEFAULT_BOOK_LEVEL)))
    });

    let s = stub.clone();
    engine.register_fn("get_bid", move |symbol: Dynamic, level: Dynamic| -> Dynamic {
        to_dynamic(s.with(|stub| stub.get_bid(&text_of(&symbol), int_of(&level))))
    });

    let s = stub.clone();
    engine.register_fn("get_ask", move |symbol: Dynamic| -> Dynamic {
        to_dynamic(s.with(|stub| stub.get_ask(&text_of(&symbol), DEFAULT_BOOK_LEVEL)))
    });

    let s = stub.clone();
    engine.register_fn("get_ask", move |symbol: Dynamic, level: Dynamic| -> Dynamic {
        to_dynamic(s.with(|stub| stub.get_ask(&text_of(&symbol), int_of(&level))))
    });

    let s = stub.clone();
    engine.register_fn(
        "get_margin_buy_capacity",
        move |symbol: Dynamic, price: Dynamic, order_kind: Dynamic| -> i64 {
            s.with(|stub| stub.get_margin_buy_capacity(&text_of(&symbol), number_of(&price), &text_of(&order_kind)))
        },
    );

    // ── Commands ──

    let s = stub.clone();
    engine.register_fn(
        "submit_limit_order",
        move |symbol: Dynamic,
              price: Dynamic,
              qty: Dynamic,
              side: Dynamic,
              tif: Dynamic,
              session: Dynamic| {
            let order = OrderRecord {
                symbol: text_of(&symbol),
                price: number_of(&price),
                quantity: number_of(&qty).filter(|q| q.is_finite()).map(|q| q as i64),
                side: text_of(&side),
                time_in_force: text_of(&tif),
                session: text_of(&session),
            };
            s.with_mut(|stub| stub.submit_limit_order(order));
        },
    );

    let s = stub.clone();
    engine.register_fn("emit_alert", move |text: Dynamic| {
        s.with_mut(|stub| stub.emit_alert(&text_of(&text)));
    });
}
