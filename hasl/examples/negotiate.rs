use std::env::args;

use hasl::Context;

// Walks the mechanisms a server would advertise, and prints what the client
// would send for each of them. Run with RUST_LOG=debug to see the skipped ones.
fn main() -> Result<(), Option<()>> {
    env_logger::init();

    let args: Vec<String> = args().collect();
    if args.len() < 4 || args.len() > 5 {
        println!(
            "Usage: {} <mechanisms> <username> <password> [--tls]",
            args[0]
        );
        return Err(None);
    }

    let mut context = Context::builder()
        .with_allowed_mechanisms(args[1].as_str())
        .with_username(args[2].as_str())
        .with_password(args[3].as_str())
        .with_tls(args.get(4).map(String::as_str) == Some("--tls"))
        .build()
        .map_err(|e| {
            println!("Invalid configuration: {}", e);
            None::<()>
        })?;

    println!("Supported mechanisms: {}", context.supported_mechanisms());

    while let Some(name) = context.next() {
        let name = name.to_owned();
        match context.step(&[]) {
            Ok(response) => println!(
                "{}: {} “{}”",
                name,
                if response.is_success() { "success" } else { "continue" },
                response.data().escape_ascii()
            ),
            Err(e) => println!("{}: {}", name, e),
        }
    }

    println!("No mechanism left to try.");
    Ok(())
}
