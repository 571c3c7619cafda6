//! Emits the DummySite CRD manifest as YAML on stdout.
//!
//! Usage: `cargo run --bin crdgen > dummysite-crd.yaml`

use crds::DummySite;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&DummySite::crd())?);
    Ok(())
}
