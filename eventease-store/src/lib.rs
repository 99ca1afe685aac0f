pub mod app_config;
pub mod database;
pub mod events;
pub mod inquiry_repo;
pub mod memory_repo;

pub use database::DbClient;
pub use events::{EventProducer, KafkaChangeNotifier};
pub use inquiry_repo::PgInquiryRepository;
pub use memory_repo::InMemoryInquiryRepository;
