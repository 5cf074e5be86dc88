use webpush::VapidKeyPair;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }

    let json = args.iter().any(|a| a == "--json");

    let keys = VapidKeyPair::generate();
    let public_b64 = keys.public_key_base64url();
    let private_b64 = keys.private_key_base64url();

    if json {
        println!(
            "{}",
            serde_json::json!({ "public_key": public_b64, "private_key": private_b64 })
        );
    } else {
        println!("Public Key: {}", public_b64);
        println!("Private Key: {}", private_b64);
    }

    Ok(())
}

fn print_help() {
    println!("fleet-push-vapid - Generate VAPID keys for Web Push");
    println!();
    println!("Usage:");
    println!("  fleet-push-vapid           # prints 'Public Key:' and 'Private Key:' lines");
    println!("  fleet-push-vapid --json    # prints JSON");
    println!();
    println!("Environment variables to set:");
    println!("  WEB_PUSH_VAPID_PUBLIC_KEY=<Public Key>");
    println!("  WEB_PUSH_VAPID_PRIVATE_KEY=<Private Key>");
    println!("  WEB_PUSH_VAPID_SUBJECT=mailto:admin@example.com");
}
