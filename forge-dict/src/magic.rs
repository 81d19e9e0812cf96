/// Environment variable overriding the location of the configuration file.
pub const ENV_CONFIG_PATH: &str = "FORGE_CONFIG_PATH";

/// `TYPE` header value of dictionary update frames.
pub const DICT_UPDATE_TYPE: &str = "DICT_UPDATE";
pub const DICT_HEADER_KEY: &str = "DICT";
pub const COUNT_HEADER_KEY: &str = "COUNT";
pub const CHECKSUM_HEADER_KEY: &str = "CHECKSUM";

/// Number of SHA-256 bytes carried by the `CHECKSUM` header.
pub const CHECKSUM_BYTES: usize = 8;

/// Payload tokens per dictionary update entry: word, combo, frequency, source.
pub const ENTRY_ARITY: usize = 4;

/// Longest accepted dictionary id.
pub const MAX_DICTIONARY_ID_LEN: usize = 128;
