//! Checkout flow wired through the container.
//!
//! Run with `cargo run --example checkout --features logging-pretty`.

use service_container::logging;
use service_container::prelude::*;
use std::sync::Mutex;

trait PaymentGateway: Send + Sync {
    fn charge(&self, cents: u64) -> u64;
    fn set_discount(&self, percent: u64);
}

impl Injectable for dyn PaymentGateway {}

struct BankGateway {
    discount: Mutex<u64>,
}

impl PaymentGateway for BankGateway {
    fn charge(&self, cents: u64) -> u64 {
        let discount = *self.discount.lock().unwrap();
        cents - cents * discount / 100
    }

    fn set_discount(&self, percent: u64) {
        *self.discount.lock().unwrap() = percent;
    }
}

struct RequestLog {
    entries: Mutex<Vec<String>>,
}

impl Service for RequestLog {
    type Dependencies = ();
    const LIFETIME: Lifetime = Lifetime::Scoped;

    fn create(_: ()) -> Self {
        RequestLog {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl RequestLog {
    fn record(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }
}

struct OrderController {
    gateway: Arc<dyn PaymentGateway>,
    log: Arc<RequestLog>,
}

impl Service for OrderController {
    type Dependencies = (Arc<dyn PaymentGateway>, Arc<RequestLog>);

    fn create((gateway, log): Self::Dependencies) -> Self {
        OrderController { gateway, log }
    }
}

impl OrderController {
    fn place(&self, cents: u64) -> u64 {
        let charged = self.gateway.charge(cents);
        self.log.record(format!("order {cents} -> {charged}"));
        charged
    }
}

struct PromotionService {
    gateway: Arc<dyn PaymentGateway>,
    currency: Value<String>,
}

impl Service for PromotionService {
    type Dependencies = (Arc<dyn PaymentGateway>, Value<String>);

    fn create((gateway, currency): Self::Dependencies) -> Self {
        PromotionService { gateway, currency }
    }
}

fn main() -> Result<()> {
    logging::builder()
        .container_only()
        .with_thread_names()
        .pretty()
        .init();

    let container = Container::new();
    container.instance(String::from("EUR"));
    container.singleton::<dyn PaymentGateway, _>(|_| {
        Ok(Arc::new(BankGateway {
            discount: Mutex::new(0),
        }))
    });
    container.lock();

    let promotions = container.get::<PromotionService>()?;
    promotions.gateway.set_discount(20);
    println!("Promotion active: 20% off in {}", *promotions.currency);

    for cents in [1_000, 2_500] {
        let request = container.begin_scope();
        let orders = request.get::<OrderController>()?;
        let charged = orders.place(cents);

        let log = request.get::<RequestLog>()?;
        println!(
            "{}: charged {charged} ({} log entries)",
            request.scope(),
            log.entries.lock().unwrap().len()
        );
    }

    println!(
        "OrderController depends on {:?}",
        container
            .dependencies_of::<OrderController>()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );

    Ok(())
}
