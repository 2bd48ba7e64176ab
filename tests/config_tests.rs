use fsrcnn_rust::config::{Config, NetworkConfig, TrainingConfig};
use fsrcnn_rust::config_file::ConfigFile;

#[test]
fn test_network_config_default() {
    let config = NetworkConfig::default();
    assert_eq!(config.num_channels, 1);
    assert_eq!(config.scale_factor, 4);
    assert_eq!(config.d, 56);
    assert_eq!(config.s, 12);
    assert_eq!(config.m, 4);
}

#[test]
fn test_network_config_validate_channels() {
    let config = NetworkConfig::builder().num_channels(2).build();
    let result = config.validate();
    assert!(result.is_err());
    assert!(format!("{}", result.unwrap_err()).contains("must be 1 or 3"));
}

#[test]
fn test_network_config_validate_zero_scale() {
    let config = NetworkConfig::builder().scale_factor(0).build();
    assert!(format!("{}", config.validate().unwrap_err()).contains("Scale factor must be greater than 0"));
}

#[test]
fn test_border_is_twice_the_scale() {
    assert_eq!(NetworkConfig::builder().scale_factor(3).build().border(), 6);
    assert_eq!(NetworkConfig::default().border(), 8);
}

#[test]
fn test_zero_mapping_layers_is_valid() {
    assert!(NetworkConfig::builder().m(0).build().validate().is_ok());
}

#[test]
fn test_training_config_default() {
    let config = TrainingConfig::default();
    assert_eq!(config.num_epochs, 100);
    assert_eq!(config.save_epochs, 10);
    assert_eq!(config.batch_size, 64);
    assert_eq!(config.test_batch_size, 1);
    assert!((config.learning_rate - 1e-3).abs() < 1e-9);
    assert_eq!(config.crop_size, 32);
    assert_eq!(config.probe_index, 2);
    assert_eq!(config.seed, None);
}

#[test]
fn test_training_config_validate() {
    assert!(TrainingConfig::builder().learning_rate(0.0).build().validate().is_err());
    assert!(TrainingConfig::builder().save_epochs(0).build().validate().is_err());
    assert!(TrainingConfig::builder().batch_size(0).build().validate().is_err());
    assert!(TrainingConfig::builder().num_epochs(0).build().validate().is_ok());
}

#[test]
fn test_model_name_with_separator_is_rejected() {
    let mut config = Config::default();
    config.run.model_name = "../escape".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_file_overrides_sections_independently() {
    let file: ConfigFile = toml::from_str(
        r#"
[network]
scale_factor = 2
m = 0

[output]
model_name = "tiny"
"#,
    )
    .unwrap();
    let config = file.to_config().unwrap();
    assert_eq!(config.network.scale_factor, 2);
    assert_eq!(config.network.m, 0);
    assert_eq!(config.run.model_name, "tiny");
    assert_eq!(config.run.test_dataset, "bsds300");
    assert!(config.is_grayscale());
}
