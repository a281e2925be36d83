//! Application-log noise generation with per-language template pools.
//!
//! The level split is a designed constant: 99% INFO, 0.8% WARN, 0.2% ERROR.
//! Real services are overwhelmingly quiet — an agent grepping for ERROR
//! should find a handful of plausible red herrings, not a wall of them.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    entry::{Entry, LogLine},
    generator::{EntryGenerator, GeneratorConfig},
    rng::PositionRng,
    types::Position,
};

/// Implementation language of the simulated service. Selects which
/// template pool a service logs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLanguage {
    #[default]
    Go,
    Python,
    Rust,
    Java,
}

pub struct LogNoiseGenerator {
    service_name: String,
    language: ServiceLanguage,
}

impl LogNoiseGenerator {
    pub fn new(service_name: impl Into<String>, language: ServiceLanguage) -> Self {
        Self {
            service_name: service_name.into(),
            language,
        }
    }
}

impl EntryGenerator for LogNoiseGenerator {
    fn generate(
        &self,
        config: &GeneratorConfig,
        position: Position,
        rng: &mut PositionRng,
    ) -> Entry {
        let jitter_seconds = rng.range_i64(-30, 30);
        let timestamp = config.base_time(position) + Duration::seconds(jitter_seconds);

        // 99% INFO / 0.8% WARN / 0.2% ERROR.
        let roll = rng.next_f64();
        let level = if roll < 0.002 {
            "ERROR"
        } else if roll < 0.01 {
            "WARN"
        } else {
            "INFO"
        };

        let message = match self.language {
            ServiceLanguage::Go => go_message(level, rng),
            ServiceLanguage::Python => python_message(level, rng),
            ServiceLanguage::Rust => rust_message(level, rng),
            ServiceLanguage::Java => java_message(level, rng),
        };

        let function = *rng.pick(functions(self.language));

        Entry::Log(LogLine {
            timestamp,
            level: level.to_string(),
            message,
            function: function.to_string(),
            service: self.service_name.clone(),
        })
    }
}

fn functions(language: ServiceLanguage) -> &'static [&'static str] {
    match language {
        ServiceLanguage::Go => &[
            "PlaceOrder", "quoteShipping", "shipOrder", "sendOrderConfirmation",
            "getUserCart", "chargeCard", "prepOrderItems", "convertCurrency",
            "sendToPostProcessor", "emptyUserCart", "validateAddress",
        ],
        ServiceLanguage::Python => &[
            "ListRecommendations", "get_product", "refresh_catalog",
            "predict", "serve", "health_check",
        ],
        ServiceLanguage::Rust => &["get_quote", "ship_order", "calculate_cost", "health_check"],
        ServiceLanguage::Java => &["getAds", "evaluateFlag", "renderAd", "healthCheck"],
    }
}

fn hexish(rng: &mut PositionRng, lo: u64, hi: u64) -> String {
    format!("{:06x}", lo + rng.below(hi - lo))
}

fn go_message(level: &str, rng: &mut PositionRng) -> String {
    match level {
        "ERROR" => match rng.below(4) {
            0 => format!(
                "failed POST to {}: context deadline exceeded (Client.Timeout exceeded while awaiting headers)",
                rng.pick(&["shipping service", "email service", "cart service"])
            ),
            1 => "could not charge the card: rpc error: code = DeadlineExceeded".to_string(),
            2 => format!(
                "shipping quote failure: failed POST to {}: context deadline exceeded",
                rng.pick(&["shipping service", "email service", "cart service"])
            ),
            _ => "failed to get user cart during checkout: rpc error: code = Unavailable".to_string(),
        },
        "WARN" => match rng.below(5) {
            0 => format!(
                "retrying request attempt {}/5, backoff {}s",
                rng.below(5) + 1,
                rng.pick(&[2u64, 4, 8, 16, 32])
            ),
            1 => format!("slow query detected: duration={}ms threshold=500ms", 500 + rng.below(4500)),
            2 => format!("context deadline approaching: remaining={}ms", 100 + rng.below(4900)),
            3 => format!(
                "deprecated API called: {}",
                rng.pick(&["/v1/validate", "/legacy/quote", "/api/v1/check"])
            ),
            _ => format!("connection pool utilization high: {}%", 60 + rng.below(40)),
        },
        _ => match rng.below(10) {
            0 => format!(
                "[PlaceOrder] user_id=usr-{} user_currency={}",
                hexish(rng, 0x10000, 0x9ffff),
                rng.pick(&["USD", "EUR", "GBP", "JPY", "CAD"])
            ),
            1 => format!("payment went through transaction_id=tx-{}", hexish(rng, 0x100000, 0xffffff)),
            2 => format!("order placed app.order.id=ord-{}", hexish(rng, 0x100000, 0xffffff)),
            3 => format!("order confirmation email sent to user{}@example.com", rng.below(9999) + 1),
            4 => "sending to postProcessor".to_string(),
            5 => format!(
                "Successful to write message. offset: {}, duration: {}ms",
                1000 + rng.below(49000),
                rng.below(50) + 1
            ),
            6 => format!(
                "service config: &{{productCatalogSvcAddr:{}:8080 cartSvcAddr:{}:8080}}",
                rng.pick(&["product-catalog", "cart", "payment", "shipping-service", "email-service"]),
                rng.pick(&["currency", "recommendation", "ad"])
            ),
            7 => format!(
                "connection established to {}:{}",
                rng.pick(&["product-catalog", "cart", "payment", "shipping-service", "email-service"]),
                rng.pick(&[8080u64, 9090, 50051, 3000])
            ),
            8 => "gRPC health check: SERVING".to_string(),
            _ => format!("starting to listen on tcp: \":{}\"", rng.pick(&[8080u64, 9090, 50051, 3000])),
        },
    }
}

fn python_message(level: &str, rng: &mut PositionRng) -> String {
    match level {
        "ERROR" => match rng.below(3) {
            0 => "gRPC error calling ProductCatalogService: StatusCode.DEADLINE_EXCEEDED".to_string(),
            1 => "Failed to refresh product catalog: connection refused".to_string(),
            _ => "Unhandled exception in recommendation handler".to_string(),
        },
        "WARN" => match rng.below(3) {
            0 => "Cache miss for product OLJCESPC7Z, fetching from catalog".to_string(),
            1 => format!("Recommendation model stale: last refresh {} minutes ago", rng.below(60) + 1),
            _ => format!("ThreadPoolExecutor at capacity: {}/10 workers busy", 5 + rng.below(6)),
        },
        _ => match rng.below(6) {
            0 => format!(
                "Received request: ListRecommendations for user usr-{}",
                hexish(rng, 0x10000, 0x9ffff)
            ),
            1 => format!("Product catalog cache refreshed: {} products", rng.below(100) + 1),
            2 => format!("Recommendation model loaded: version=v{}.{}", rng.below(3) + 1, rng.below(11)),
            3 => format!("gRPC server started on port {}", rng.pick(&[8080u64, 9090, 50051, 3000])),
            4 => "Health check: OK".to_string(),
            _ => format!("Processing request with {} product IDs", rng.below(100) + 1),
        },
    }
}

fn rust_message(level: &str, rng: &mut PositionRng) -> String {
    match level {
        "ERROR" => format!(
            "{}: {}",
            rng.pick(&["Internal server error", "Failed to connect to quote service"]),
            rng.pick(&["connection refused", "timeout", "broken pipe"])
        ),
        "WARN" => match rng.below(2) {
            0 => format!("Slow request: GET /get-quote latency={}ms", 200 + rng.below(300)),
            _ => format!("Connection pool running low: {} of 10 available", rng.below(6)),
        },
        _ => match rng.below(5) {
            0 => format!("Actix-web server started on 0.0.0.0:{}", rng.pick(&[8080u64, 9090, 3000])),
            1 => format!("GET /get-quote completed status=200 latency={}ms", rng.below(500) + 1),
            2 => format!("POST /ship-order completed status=200 latency={}ms", rng.below(500) + 1),
            3 => format!(
                "Shipping cost calculated: ${}.{:02} for {} items",
                5 + rng.below(45),
                rng.below(100),
                rng.below(10) + 1
            ),
            _ => "Health check: OK".to_string(),
        },
    }
}

fn java_message(level: &str, rng: &mut PositionRng) -> String {
    match level {
        "ERROR" => match rng.below(2) {
            0 => format!(
                "java.lang.NullPointerException at AdService.getAds(AdService.java:{})",
                100 + rng.below(300)
            ),
            _ => format!(
                "io.grpc.StatusRuntimeException: UNAVAILABLE: {}",
                rng.pick(&["io exception", "connection reset", "peer not available"])
            ),
        },
        "WARN" => match rng.below(2) {
            0 => format!("High CPU load detected: {}%", 40 + rng.below(56)),
            _ => format!(
                "Ad rendering slow: {}ms for {} ads",
                rng.below(500) + 1,
                rng.below(10) + 1
            ),
        },
        _ => match rng.below(4) {
            0 => format!("AdService started on port {}", rng.pick(&[8080u64, 9090, 50051])),
            1 => format!("Feature flag adHighCpu evaluated: {}", rng.pick(&["true", "false"])),
            2 => format!(
                "Ad request processed: {} ads returned in {}ms",
                rng.below(10) + 1,
                rng.below(100) + 1
            ),
            _ => "gRPC health check: SERVING".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::source_discriminant;

    fn config(total: usize) -> GeneratorConfig {
        GeneratorConfig::new(42, source_discriminant("logs", "checkout"), total)
    }

    #[test]
    fn level_distribution_is_heavily_info() {
        let cfg = config(20_000);
        let generator = LogNoiseGenerator::new("checkout", ServiceLanguage::Go);
        let mut info = 0usize;
        let mut warn = 0usize;
        let mut error = 0usize;
        for p in 0..20_000 {
            let entry = generator.generate(&cfg, p, &mut cfg.rng_at(p));
            match entry.field("level").unwrap().as_str() {
                "INFO" => info += 1,
                "WARN" => warn += 1,
                "ERROR" => error += 1,
                other => panic!("unexpected level {other}"),
            }
        }
        assert!(info > 19_000, "INFO share too low: {info}");
        assert!((50..=400).contains(&warn), "WARN share off: {warn}");
        assert!((10..=120).contains(&error), "ERROR share off: {error}");
    }

    #[test]
    fn entry_carries_service_name() {
        let cfg = config(100);
        let generator = LogNoiseGenerator::new("shipping-service", ServiceLanguage::Rust);
        let entry = generator.generate(&cfg, 7, &mut cfg.rng_at(7));
        assert_eq!(entry.field("service").as_deref(), Some("shipping-service"));
    }
}
