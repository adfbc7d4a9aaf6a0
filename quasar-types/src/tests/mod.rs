mod config_yaml_deserialize;
mod value_serialize_test;
