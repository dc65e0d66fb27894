//! Filesystem metadata and search: `tree du cksum base64 xor df ocrypt zip unzip`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::effect::{CommandOutcome, ExecResult};
use crate::error::{CommandError, ErrorKind};
use crate::executor::flags::FlagSpec;
use crate::vfs::Node;

use super::context::{actor_ref, parse_flags, CommandCtx};

pub fn tree(ctx: &mut CommandCtx) -> ExecResult {
    let target = ctx.argv.get(1).cloned().unwrap_or_else(|| ".".to_string());
    let path = ctx.resolve_path(&target);
    let node = ctx.vfs.get_node(&path, true)?;
    let mut out = String::from(".");
    render_tree(node, 0, &mut out);
    Ok(CommandOutcome::ok(out))
}

fn render_tree(node: &Node, depth: usize, out: &mut String) {
    if let Node::Directory { children, .. } = node {
        for (name, child) in children {
            out.push('\n');
            out.push_str(&"  ".repeat(depth + 1));
            out.push_str(name);
            render_tree(child, depth + 1, out);
        }
    }
}

pub const DU_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('h'), long: Some("human-readable"), takes_value: false }];

pub fn du(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], DU_FLAGS)?;
    let target = ctx.flags.positionals.first().cloned().unwrap_or_else(|| ".".to_string());
    let path = ctx.resolve_path(&target);
    let size = ctx.vfs.calculate_node_size(&path)?;
    Ok(CommandOutcome::ok(format!("{}\t{}", size, target)))
}

pub fn cksum(ctx: &mut CommandCtx) -> ExecResult {
    let target = ctx.argv.get(1).cloned().ok_or_else(|| {
        crate::error::CommandError::new(crate::error::ErrorKind::InvalidArgument, "cksum: missing operand")
    })?;
    let path = ctx.resolve_path(&target);
    let content = ctx.vfs.get_node(&path, true)?.content().unwrap_or_default().to_string();
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(content.as_bytes());
    let crc = hasher.finalize();
    Ok(CommandOutcome::ok(format!("{} {} {}", crc, content.len(), target)))
}

pub const BASE64_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('d'), long: Some("decode"), takes_value: false }];

/// `base64 [-d] [file]`: encodes a file's content (or stdin) to base64, or
/// decodes it back with `-d`. Since pipeline output is always text, decoding
/// binary garbage reports an error rather than emitting invalid UTF-8.
pub fn base64_cmd(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], BASE64_FLAGS)?;
    let files = ctx.flags.positionals.clone();
    let text = if let Some(file) = files.first() {
        let path = ctx.resolve_path(file);
        ctx.vfs.get_node(&path, true)?.content().unwrap_or_default().to_string()
    } else {
        ctx.stdin.clone()
    };
    if ctx.flags.is_set("decode") {
        let bytes = STANDARD.decode(text.trim()).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "base64: invalid input"))?;
        let decoded = String::from_utf8(bytes).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "base64: decoded data is not valid text"))?;
        Ok(CommandOutcome::ok(decoded))
    } else {
        Ok(CommandOutcome::ok(STANDARD.encode(text.as_bytes())))
    }
}

pub const XOR_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('d'), long: Some("decode"), takes_value: false }];

fn xor_bytes(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter().enumerate().map(|(i, b)| b ^ key[i % key.len()]).collect()
}

/// `xor [-d] KEY`: a repeating-key XOR cipher. Plaintext in, hex-encoded
/// ciphertext out; `-d` reverses that, so the pipeline's text-only `stdout`
/// never has to carry raw, possibly non-UTF-8 bytes.
pub fn xor(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], XOR_FLAGS)?;
    let key = ctx.flags.positionals.first().cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "xor: missing key"))?;
    if key.is_empty() {
        return Err(CommandError::new(ErrorKind::InvalidArgument, "xor: key must not be empty"));
    }
    let key_bytes = key.as_bytes();
    if ctx.flags.is_set("decode") {
        let ciphertext = hex::decode(ctx.stdin.trim()).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "xor: invalid hex input"))?;
        let plain = xor_bytes(&ciphertext, key_bytes);
        let text = String::from_utf8(plain).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "xor: decoded data is not valid text"))?;
        Ok(CommandOutcome::ok(text))
    } else {
        let cipher = xor_bytes(ctx.stdin.as_bytes(), key_bytes);
        Ok(CommandOutcome::ok(hex::encode(cipher)))
    }
}

/// `df`: reports total VFS usage against the configured ceiling, coreutils-
/// style (`Filesystem Size Used Avail Use%`, sizes in 1K blocks).
pub fn df(ctx: &mut CommandCtx) -> ExecResult {
    let used = ctx.vfs.calculate_node_size("/")?;
    let total = ctx.config.max_vfs_size;
    let avail = total.saturating_sub(used);
    let pct = if total == 0 { 0 } else { (used * 100) / total };
    let header = format!("{:<12} {:>10} {:>10} {:>10} {:>5} {}", "Filesystem", "1K-blocks", "Used", "Available", "Use%", "Mounted on");
    let row = format!("{:<12} {:>10} {:>10} {:>10} {:>4}% {}", "samwisefs", total / 1024, used / 1024, avail / 1024, pct, "/");
    Ok(CommandOutcome::ok(format!("{}\n{}", header, row)))
}

const OCRYPT_SALT_LEN: usize = 16;
const OCRYPT_OUTPUT_LEN: usize = 32;

fn ocrypt_derive_key(password: &str, salt: &[u8]) -> [u8; OCRYPT_OUTPUT_LEN] {
    let mut out = [0u8; OCRYPT_OUTPUT_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, 100_000, &mut out)
        .expect("fixed-size output buffer matches algorithm requirements");
    out
}

pub const OCRYPT_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('d'), long: Some("decode"), takes_value: false }];

/// `ocrypt [-d] PASSWORD`: a salted, password-keyed stream cipher in the same
/// repeating-XOR idiom as `xor`, but deriving its keystream through PBKDF2
/// rather than using the password bytes directly. Ciphertext is hex-encoded
/// `salt || xor(plaintext, derived_key)`.
pub fn ocrypt(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], OCRYPT_FLAGS)?;
    let password = ctx.flags.positionals.first().cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "ocrypt: missing password"))?;

    if ctx.flags.is_set("decode") {
        let raw = hex::decode(ctx.stdin.trim()).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "ocrypt: invalid hex input"))?;
        if raw.len() < OCRYPT_SALT_LEN {
            return Err(CommandError::new(ErrorKind::InvalidArgument, "ocrypt: ciphertext too short"));
        }
        let (salt, ciphertext) = raw.split_at(OCRYPT_SALT_LEN);
        let key = ocrypt_derive_key(&password, salt);
        let plain = xor_bytes(ciphertext, &key);
        let text = String::from_utf8(plain).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "ocrypt: decoded data is not valid text"))?;
        Ok(CommandOutcome::ok(text))
    } else {
        let mut salt = [0u8; OCRYPT_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = ocrypt_derive_key(&password, &salt);
        let cipher = xor_bytes(ctx.stdin.as_bytes(), &key);
        let mut payload = salt.to_vec();
        payload.extend(cipher);
        Ok(CommandOutcome::ok(hex::encode(payload)))
    }
}

fn collect_files(node: &Node, prefix: &str, out: &mut Vec<(String, String)>) {
    if let Node::Directory { children, .. } = node {
        for (name, child) in children {
            let path = format!("{}/{}", prefix.trim_end_matches('/'), name);
            match child {
                Node::File { .. } => out.push((path, child.content().unwrap_or_default().to_string())),
                Node::Directory { .. } => collect_files(child, &path, out),
                Node::Symlink { .. } => {}
            }
        }
    }
}

/// `zip ARCHIVE.zip TARGET`: deflates a file or an entire directory subtree
/// into a zip archive, base64-encoded since archive bytes can't flow through
/// the text-only pipeline `stdout`.
pub fn zip(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv[1..].to_vec();
    if argv.len() < 2 {
        return Err(CommandError::new(ErrorKind::InvalidArgument, "zip: usage: zip ARCHIVE TARGET"));
    }
    let (archive_name, target) = (argv[0].clone(), argv[1].clone());
    let target_path = ctx.resolve_path(&target);
    let node = ctx.vfs.get_node(&target_path, true)?;

    let mut entries = Vec::new();
    let basename = target.rsplit('/').next().unwrap_or(&target).to_string();
    match node {
        Node::File { .. } => entries.push((basename.clone(), node.content().unwrap_or_default().to_string())),
        Node::Directory { .. } => collect_files(node, &format!("/{}", basename), &mut entries),
        Node::Symlink { .. } => return Err(CommandError::new(ErrorKind::InvalidArgument, "zip: cannot archive a symlink")),
    }

    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = ::zip::ZipWriter::new(cursor);
        let options = ::zip::write::SimpleFileOptions::default().compression_method(::zip::CompressionMethod::Deflated);
        for (name, content) in &entries {
            let entry_name = name.trim_start_matches('/');
            writer
                .start_file(entry_name, options)
                .map_err(|e| CommandError::new(ErrorKind::Internal, format!("zip: {}", e)))?;
            std::io::Write::write_all(&mut writer, content.as_bytes())
                .map_err(|e| CommandError::new(ErrorKind::Internal, format!("zip: {}", e)))?;
        }
        writer.finish().map_err(|e| CommandError::new(ErrorKind::Internal, format!("zip: {}", e)))?;
    }

    let encoded = STANDARD.encode(&buf);
    let archive_path = ctx.resolve_path(&archive_name);
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.write_file(&archive_path, &encoded, &actor)?;
    Ok(CommandOutcome::ok(format!("  adding: {} ({} entries)", archive_name, entries.len())))
}

/// `unzip ARCHIVE.zip [-d DEST]`: inflates a base64-stored zip archive
/// (as produced by `zip`) back into the tree, entries as sibling files.
pub const UNZIP_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('d'), long: Some("destination"), takes_value: true }];

pub fn unzip(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], UNZIP_FLAGS)?;
    let archive_name = ctx.flags.positionals.first().cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "unzip: missing archive"))?;
    let dest = ctx.flags.value("destination").map(str::to_string).unwrap_or_else(|| ".".to_string());

    let archive_path = ctx.resolve_path(&archive_name);
    let encoded = ctx.vfs.get_node(&archive_path, true)?.content().unwrap_or_default().to_string();
    let raw = STANDARD.decode(encoded.trim()).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "unzip: corrupt archive"))?;

    let cursor = std::io::Cursor::new(raw);
    let mut archive = ::zip::ZipArchive::new(cursor).map_err(|e| CommandError::new(ErrorKind::InvalidArgument, format!("unzip: {}", e)))?;

    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| CommandError::new(ErrorKind::Internal, format!("unzip: {}", e)))?;
        let mut content = String::new();
        std::io::Read::read_to_string(&mut entry, &mut content)
            .map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "unzip: entry is not valid text"))?;
        let entry_name = entry.name().to_string();
        let out_path = crate::vfs::path::resolve(&ctx.resolve_path(&dest), &entry_name);
        ctx.vfs.write_file(&out_path, &content, &actor)?;
        extracted.push(format!("  inflating: {}", entry_name));
    }
    Ok(CommandOutcome::ok(extracted.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_round_trips_through_itself() {
        let key = b"k";
        let data = b"hello";
        let once = xor_bytes(data, key);
        let twice = xor_bytes(&once, key);
        assert_eq!(twice, data);
    }
}
