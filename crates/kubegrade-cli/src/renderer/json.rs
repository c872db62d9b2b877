//! JSON renderer - the scorecard serialized as-is

use kubegrade_core::Scorecard;

pub fn render(card: &Scorecard) -> serde_json::Result<String> {
    let mut output = serde_json::to_string_pretty(card)?;
    output.push('\n');
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kubegrade_core::{Check, FileLocation, TestScore, TypeMeta};

    #[test]
    fn test_json_output_is_valid_and_keyed() {
        let mut card = Scorecard::new();
        let tm = TypeMeta::new("v1", "Service");
        let meta = ObjectMeta {
            name: Some("svc".to_string()),
            ..Default::default()
        };
        card.object_mut(&tm, &meta, &FileLocation::new("svc.yaml", 1))
            .add(
                Check::new("Service Type", "Service", "", false),
                TestScore::ok(),
            );

        let output = render(&card).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let object = &value["objects"]["Service/v1//svc"];
        assert_eq!(object["name"], "svc");
        assert_eq!(object["results"][0]["score"]["grade"], "all_ok");
    }
}
