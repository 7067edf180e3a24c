//! # mini_http - Entry Point
//! src/main.rs
//!
//! Servidor de demostración:
//!
//! - `GET /` → `ok`
//! - `GET /users/:id` → JSON con el id capturado
//! - `POST /echo` → devuelve el body JSON recibido

use mini_http::config::Config;
use mini_http::http::Response;
use mini_http::middleware::{batteries, compose, handler, Handler};
use mini_http::router::Router;
use mini_http::server::Server;
use serde_json::{json, Value};
use tracing::{error, info};

fn app() -> Handler {
    let router = Router::root(vec![
        Router::get(handler(|_req| Ok(Response::default().text("ok")))),
        Router::node(
            "/users",
            vec![],
            vec![Router::node(
                "/:id",
                vec![],
                vec![Router::get(handler(|req| {
                    Response::default().json(&json!({
                        "id": req.param("id"),
                        "ip": req.ip(),
                    }))
                }))],
            )],
        ),
        Router::node(
            "/echo",
            vec![],
            vec![Router::post(handler(|req| {
                let body: Value = req.json()?;
                Response::default().json(&body)
            }))],
        ),
    ]);

    compose(vec![batteries::logger(), batteries::remove_trailing_slash()])(router.into_handler())
}

fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("Configuración inválida: {}", e);
        std::process::exit(2);
    }

    mini_http::logging::init(&config);

    let server = Server::new(app(), config.trust_proxy);
    if let Err(e) = server.boot(config.port) {
        error!(error = %e, address = %config.address(), "could not start server");
        std::process::exit(1);
    }
    info!(address = %config.address(), trust_proxy = config.trust_proxy, "ready");

    // El accept loop corre en su propio thread
    loop {
        std::thread::park();
    }
}
