use kube::core::CustomResourceExt;
use wfc_gc::crd::workflow::Workflow;

fn main() -> anyhow::Result<()> {
    let crd = Workflow::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    println!("{}", yaml);
    Ok(())
}
