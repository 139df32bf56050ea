/// Optional features that end up in the version's build metadata, e.g. `0.1.0+otr`.
const TAGGED_FEATURES: [(&str, &str); 4] = [
    ("OPENAPI", "o"),
    ("SENTRY", "s"),
    ("TLS_NATIVE", "tn"),
    ("TLS_RUSTLS", "tr"),
];

fn main() {
    check_features();

    let version = tagged_version();
    println!("cargo:rustc-env=VERSION={version}");
    println!("cargo:warning=Feature tagged version: {version}");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}

fn enabled(feature: &str) -> bool {
    std::env::var_os(format!("CARGO_FEATURE_{feature}")).is_some()
}

fn check_features() {
    match (enabled("TLS_RUSTLS"), enabled("TLS_NATIVE")) {
        (true, true) => panic!("'tls-rustls' and 'tls-native' are mutually exclusive, pick one TLS backend."),
        (false, false) if enabled("SENTRY") => {
            panic!("'sentry' reports over HTTPS and needs 'tls-rustls' or 'tls-native'.")
        }
        (false, false) => println!(
            "cargo:warning=Built without a TLS backend, Graph API calls need HTTPS. Enable 'tls-rustls' or 'tls-native'."
        ),
        _ => {}
    }
}

fn tagged_version() -> String {
    let tags: String = TAGGED_FEATURES
        .iter()
        .filter(|(feature, _)| enabled(feature))
        .map(|(_, tag)| *tag)
        .collect();

    match tags.as_str() {
        "" => env!("CARGO_PKG_VERSION").to_string(),
        tags => format!("{}+{tags}", env!("CARGO_PKG_VERSION")),
    }
}
