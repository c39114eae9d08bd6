//! Build script to compile the blog service protobuf definitions.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/blog.proto");
    tonic_build::compile_protos("proto/blog.proto")?;
    Ok(())
}
