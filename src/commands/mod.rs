//! The builtin command catalog: a declarative registry keyed by name,
//! built once via `OnceLock` (chosen over `lazy_static`, matching this
//! crate's avoidance of that crate elsewhere).

pub mod ai;
pub mod context;
pub mod fileops;
pub mod fsmeta;
pub mod identitycmds;
pub mod shellstate;
pub mod structural;
pub mod textproc;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::executor::flags::FlagSpec;
pub use context::{CommandCtx, CommandFn};

pub struct CommandEntry {
    pub name: &'static str,
    pub flags: &'static [FlagSpec],
    pub root_required: bool,
    pub run: CommandFn,
}

static REGISTRY: OnceLock<HashMap<&'static str, CommandEntry>> = OnceLock::new();

pub fn registry() -> &'static HashMap<&'static str, CommandEntry> {
    REGISTRY.get_or_init(build_registry)
}

pub fn lookup(name: &str) -> Option<&'static CommandEntry> {
    registry().get(name)
}

macro_rules! entry {
    ($map:expr, $name:expr, $flags:expr, $root:expr, $run:path) => {
        $map.insert($name, CommandEntry { name: $name, flags: $flags, root_required: $root, run: $run });
    };
}

fn build_registry() -> HashMap<&'static str, CommandEntry> {
    let mut map = HashMap::new();

    entry!(map, "ls", fileops::LS_FLAGS, false, fileops::ls);
    entry!(map, "cp", &[], false, fileops::cp);
    entry!(map, "mv", &[], false, fileops::mv);
    entry!(map, "rm", fileops::RM_FLAGS, false, fileops::rm);
    entry!(map, "mkdir", fileops::MKDIR_FLAGS, false, fileops::mkdir);
    entry!(map, "rmdir", &[], false, fileops::rmdir);
    entry!(map, "touch", &[], false, fileops::touch);
    entry!(map, "ln", fileops::LN_FLAGS, false, fileops::ln);
    entry!(map, "chmod", &[], false, fileops::chmod);
    entry!(map, "chown", fileops::CHOWN_FLAGS, false, fileops::chown);
    entry!(map, "chgrp", fileops::CHOWN_FLAGS, false, fileops::chgrp);
    entry!(map, "find", &[], false, fileops::find);

    entry!(map, "cat", &[], false, textproc::cat);
    entry!(map, "echo", &[], false, textproc::echo);
    entry!(map, "head", textproc::HEAD_FLAGS, false, textproc::head);
    entry!(map, "tail", textproc::HEAD_FLAGS, false, textproc::tail);
    entry!(map, "sort", textproc::SORT_FLAGS, false, textproc::sort);
    entry!(map, "uniq", textproc::UNIQ_FLAGS, false, textproc::uniq);
    entry!(map, "wc", textproc::WC_FLAGS, false, textproc::wc);
    entry!(map, "grep", textproc::GREP_FLAGS, false, textproc::grep);
    entry!(map, "cut", textproc::CUT_FLAGS, false, textproc::cut);
    entry!(map, "tr", textproc::TR_FLAGS, false, textproc::tr);
    entry!(map, "nl", &[], false, textproc::nl);
    entry!(map, "comm", textproc::COMM_FLAGS, false, textproc::comm);
    entry!(map, "diff", &[], false, textproc::diff);
    entry!(map, "csplit", textproc::CSPLIT_FLAGS, false, textproc::csplit);
    entry!(map, "printf", &[], false, textproc::printf);
    entry!(map, "awk", textproc::AWK_FLAGS, false, textproc::awk);
    entry!(map, "sed", &[], false, textproc::sed);

    entry!(map, "tree", &[], false, fsmeta::tree);
    entry!(map, "du", fsmeta::DU_FLAGS, false, fsmeta::du);
    entry!(map, "cksum", &[], false, fsmeta::cksum);
    entry!(map, "df", &[], false, fsmeta::df);
    entry!(map, "ocrypt", fsmeta::OCRYPT_FLAGS, false, fsmeta::ocrypt);
    entry!(map, "zip", &[], false, fsmeta::zip);
    entry!(map, "unzip", fsmeta::UNZIP_FLAGS, false, fsmeta::unzip);

    entry!(map, "pwd", &[], false, shellstate::pwd);
    entry!(map, "cd", &[], false, shellstate::cd);
    entry!(map, "whoami", &[], false, shellstate::whoami);
    entry!(map, "clear", &[], false, shellstate::clear);
    entry!(map, "date", &[], false, shellstate::date);
    entry!(map, "alias", &[], false, shellstate::alias);
    entry!(map, "unalias", &[], false, shellstate::unalias);
    entry!(map, "set", &[], false, shellstate::set);
    entry!(map, "unset", &[], false, shellstate::unset);
    entry!(map, "history", &[], false, shellstate::history);
    entry!(map, "jobs", &[], false, shellstate::jobs);
    entry!(map, "fg", &[], false, shellstate::fg);
    entry!(map, "bg", &[], false, shellstate::bg);
    entry!(map, "kill", &[], false, shellstate::kill);
    entry!(map, "ps", &[], false, shellstate::ps);
    entry!(map, "who", &[], false, shellstate::who);
    entry!(map, "uptime", &[], false, shellstate::uptime);

    entry!(map, "useradd", &[], true, identitycmds::useradd);
    entry!(map, "removeuser", &[], true, identitycmds::removeuser);
    entry!(map, "groupadd", &[], true, identitycmds::groupadd);
    entry!(map, "groupdel", &[], true, identitycmds::groupdel);
    entry!(map, "groups", &[], false, identitycmds::groups);
    entry!(map, "listusers", &[], false, identitycmds::listusers);
    entry!(map, "passwd", &[], false, identitycmds::passwd);
    entry!(map, "su", &[], false, identitycmds::su);
    entry!(map, "logout", &[], false, identitycmds::logout);
    entry!(map, "sudo", &[], false, identitycmds::sudo);
    entry!(map, "usermod", identitycmds::USERMOD_FLAGS, true, identitycmds::usermod);
    entry!(map, "login", &[], false, identitycmds::login);
    entry!(map, "visudo", &[], true, identitycmds::visudo);

    entry!(map, "reset", structural::RESET_FLAGS, true, structural::reset);
    entry!(map, "backup", &[], false, structural::backup);
    entry!(map, "restore", &[], false, structural::restore);
    entry!(map, "fsck", structural::FSCK_FLAGS, true, structural::fsck);
    entry!(map, "help", &[], false, structural::help);
    entry!(map, "story", &[], false, structural::story);
    entry!(map, "sync", &[], false, structural::sync);
    entry!(map, "reboot", &[], true, structural::reboot);
    entry!(map, "man", &[], false, structural::man);
    entry!(map, "printscreen", &[], false, structural::printscreen);
    entry!(map, "run", &[], false, structural::run);
    entry!(map, "more", &[], false, structural::more);
    entry!(map, "less", &[], false, structural::less);

    entry!(map, "base64", fsmeta::BASE64_FLAGS, false, fsmeta::base64_cmd);
    entry!(map, "xor", fsmeta::XOR_FLAGS, false, fsmeta::xor);

    map
}
