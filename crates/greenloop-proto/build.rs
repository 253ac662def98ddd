//! Build script for greenloop-proto
//!
//! Compiles the marketplace protobuf definitions.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = "../../proto";

    let protos = [
        "greenloop/v1/common.proto",
        "greenloop/v1/auth.proto",
        "greenloop/v1/company.proto",
        "greenloop/v1/booking.proto",
        "greenloop/v1/wallet.proto",
    ];

    let proto_paths: Vec<_> = protos
        .iter()
        .map(|p| format!("{proto_root}/{p}"))
        .collect();

    for path in &proto_paths {
        println!("cargo:rerun-if-changed={path}");
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&proto_paths, &[proto_root.to_string()])?;

    Ok(())
}
