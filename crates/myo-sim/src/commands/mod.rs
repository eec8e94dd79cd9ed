pub mod rates;
pub mod run;
pub mod version;
