pub mod alert_bus;
pub mod telegram;

pub use alert_bus::{AlertBus, DeliveryReport, Notifier};
pub use telegram::{TelegramCommandPoller, TelegramNotifier};
