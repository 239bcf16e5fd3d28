pub mod openweathermap;
pub mod postgres;

pub use openweathermap::OpenWeatherMapClient;
pub use postgres::PgRuleStore;
