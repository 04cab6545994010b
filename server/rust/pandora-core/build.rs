fn main() -> Result<(), Box<dyn std::error::Error>> {
    let reservation_proto = "proto/pandora/v1/reservation.proto";
    let proto_include = "proto";

    println!("cargo:rerun-if-changed={reservation_proto}");

    // protoc が利用できない環境ではチェックイン済みの src/proto を使う。
    if !std::path::Path::new(reservation_proto).exists() {
        println!(
            "cargo:warning=Proto file not found, skipping tonic codegen: {}",
            reservation_proto
        );
        return Ok(());
    }

    match tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .out_dir("src/proto")
        .compile_protos(&[reservation_proto], &[proto_include])
    {
        Ok(()) => {
            println!("cargo:warning=tonic-build succeeded for reservation proto");
        }
        Err(e) => {
            println!(
                "cargo:warning=tonic-build failed (protoc may not be installed): {}",
                e
            );
        }
    }
    Ok(())
}
