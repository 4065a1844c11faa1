mod server;

pub use server::{
    ChangeStatusRequest, CreateOrderRequest, HttpServer, HttpServerConfig, ListOrdersQuery,
};
