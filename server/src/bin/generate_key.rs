use base64::Engine as _;
use color_eyre::eyre::Result;
use rand::RngCore as _;

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Private cookies need at least 64 bytes of key material
    let mut key = [0u8; 64];
    rand::rngs::OsRng.fill_bytes(&mut key);

    let key_string = base64::engine::general_purpose::STANDARD.encode(key);

    println!("Generated cookie signing key:");
    print!("{}", key_string);
    println!();
    println!();
    println!("You can use this key as your COOKIE_KEY environment variable.");
    println!("For example, add the following to your .env file:");
    print!("COOKIE_KEY=\"{}\"", key_string);
    println!();

    Ok(())
}
