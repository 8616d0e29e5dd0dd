//! Model client adapters.

mod mock_client;

pub use mock_client::MockModelClient;
