// Solidity language builtins that never resolve to user code.

const FUNCTIONS: &[&str] = &[
    "require",
    "assert",
    "revert",
    "keccak256",
    "sha256",
    "sha3",
    "ripemd160",
    "ecrecover",
    "addmod",
    "mulmod",
    "selfdestruct",
    "suicide",
    "blockhash",
    "blobhash",
    "gasleft",
    "type",
];

const NAMESPACES: &[&str] = &["abi", "msg", "block", "tx", "bytes", "string"];

const MEMBERS: &[&str] = &[
    "push",
    "pop",
    "call",
    "delegatecall",
    "staticcall",
    "send",
    "encode",
    "encodePacked",
    "encodeWithSelector",
    "encodeWithSignature",
    "encodeCall",
    "decode",
    "concat",
    "value",
    "gas",
];

pub fn is_builtin_function(name: &str) -> bool {
    FUNCTIONS.contains(&name) || is_elementary_type(name)
}

pub fn is_builtin_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

pub fn is_builtin_member(name: &str) -> bool {
    MEMBERS.contains(&name)
}

/// Value types, arrays and mappings.
pub fn is_elementary_type(type_name: &str) -> bool {
    let t = type_name.trim();
    if t.ends_with(']') || t.starts_with("mapping") {
        return true;
    }
    let t = t.strip_suffix(" payable").unwrap_or(t);
    match t {
        "address" | "payable" | "bool" | "string" | "bytes" | "byte" | "uint" | "int"
        | "fixed" | "ufixed" => true,
        _ => ["uint", "int", "bytes"].iter().any(|prefix| {
            t.strip_prefix(prefix)
                .map_or(false, |digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        }),
    }
}
