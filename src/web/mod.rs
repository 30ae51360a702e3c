pub mod server;

pub use server::PredictionServer;
