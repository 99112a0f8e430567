//! Minimal genkan example — a CGI script that echoes the captured request.
//!
//! Run with:
//!   REQUEST_METHOD=POST \
//!   SERVER_PROTOCOL=HTTP/1.1 \
//!   HTTP_HOST=localhost \
//!   REQUEST_URI='/echo?q=1' \
//!   QUERY_STRING='q=1' \
//!   CONTENT_LENGTH=5 \
//!   sh -c 'printf hello | cargo run --example cgi_echo'

use genkan::Env;

fn main() {
    // stdout is the response; logs belong on stderr.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let request = match Env::new().capture() {
        Ok(request) => request,
        Err(error) => {
            println!("Status: 500 Internal Server Error");
            println!("Content-Type: text/plain");
            println!();
            println!("capture failed: {error}");
            return;
        }
    };

    println!("Content-Type: text/plain");
    println!();
    println!(
        "{} {} HTTP/{}",
        request.method(),
        request.request_target(),
        request.protocol_version()
    );
    for (name, value) in request.headers() {
        println!("header {name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    for (name, value) in request.query_params() {
        println!("query {name} = {value}");
    }
    for (name, value) in request.cookie_params() {
        println!("cookie {name} = {value}");
    }
    println!("body: {} bytes", request.body().len());
}
