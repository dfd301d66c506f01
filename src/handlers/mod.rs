pub mod dashboards;
pub mod forms;
pub mod products;
pub mod sales;
pub mod submissions;
