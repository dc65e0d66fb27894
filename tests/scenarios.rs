//! End-to-end scenarios exercising the executor against a live `SystemContext`.

use samwise_shell::executor::{self, ExecutionContext};
use samwise_shell::SystemContext;

async fn run(system: &SystemContext, session: &mut samwise_shell::session::Session, line: &str) -> String {
    let mut vfs = system.vfs.lock().unwrap();
    let mut users = system.users.lock().unwrap();
    let mut groups = system.groups.lock().unwrap();
    let mut ctx = ExecutionContext {
        vfs: &mut vfs,
        users: &mut users,
        groups: &mut groups,
        sudo: &system.sudo,
        config: &system.config,
        session,
        story: &system.story,
    };
    executor::execute(line, &mut ctx, "").await.expect("command should succeed").stdout
}

async fn run_err(system: &SystemContext, session: &mut samwise_shell::session::Session, line: &str) -> samwise_shell::error::CommandError {
    let mut vfs = system.vfs.lock().unwrap();
    let mut users = system.users.lock().unwrap();
    let mut groups = system.groups.lock().unwrap();
    let mut ctx = ExecutionContext {
        vfs: &mut vfs,
        users: &mut users,
        groups: &mut groups,
        sudo: &system.sudo,
        config: &system.config,
        session,
        story: &system.story,
    };
    executor::execute(line, &mut ctx, "").await.expect_err("command should fail")
}

#[tokio::test]
async fn pipelined_text_processing() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "mkdir -p /tmp/work").await;
    run(&system, &mut session, "cd /tmp/work").await;
    run(&system, &mut session, "echo banana > f.txt").await;
    run(&system, &mut session, "echo apple >> f.txt").await;
    run(&system, &mut session, "echo banana >> f.txt").await;
    let out = run(&system, &mut session, "cat f.txt | sort | uniq -c").await;
    assert!(out.contains("apple"));
    assert!(out.contains("2 banana"));
}

#[tokio::test]
async fn brace_expansion_globbing_and_redirection() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "mkdir -p /tmp/globtest").await;
    run(&system, &mut session, "cd /tmp/globtest").await;
    run(&system, &mut session, "touch {a,b,c}.txt").await;
    run(&system, &mut session, "ls *.txt > list.txt").await;
    let listing = run(&system, &mut session, "cat list.txt").await;
    assert!(listing.contains("a.txt"));
    assert!(listing.contains("b.txt"));
    assert!(listing.contains("c.txt"));
}

#[tokio::test]
async fn sudo_runs_as_root_and_is_audited() {
    let system = SystemContext::new();
    {
        let mut vfs = system.vfs.lock().unwrap();
        let root = samwise_shell::vfs::Actor { name: "root", effective_groups: &[] };
        vfs.write_file("/etc/sudoers", "alice ALL=(ALL) ALL\n", &root).unwrap();
    }
    {
        let mut users = system.users.lock().unwrap();
        users.register("alice", None, system.config.pbkdf2_iterations).unwrap();
    }
    let mut session = system.new_session("alice");
    let out = run(&system, &mut session, "sudo whoami").await;
    assert_eq!(out, "root");
    let audit = {
        let vfs = system.vfs.lock().unwrap();
        samwise_shell::audit::read_log(&vfs)
    };
    assert!(audit.contains("ACTION: sudo"));
}

#[tokio::test]
async fn permission_denied_is_reported_as_warded_when_scheduled() {
    let system = SystemContext::new();
    {
        let mut vfs = system.vfs.lock().unwrap();
        let root = samwise_shell::vfs::Actor { name: "root", effective_groups: &[] };
        vfs.create_directory("/protected", &root, false).unwrap();
        vfs.chmod("/protected", 0o000, &root).unwrap();
        vfs.write_file("/etc/agenda.json", r#"[{"command":"chmod 755 /protected"}]"#, &root).unwrap();
        vfs.refresh_agenda_cache();
    }
    {
        let mut users = system.users.lock().unwrap();
        users.register("mallory", None, system.config.pbkdf2_iterations).unwrap();
    }
    let mut session = system.new_session("mallory");
    let err = run_err(&system, &mut session, "echo x > /protected/f").await;
    assert_eq!(err.kind, samwise_shell::error::ErrorKind::Warded);
}

#[tokio::test]
async fn story_snapshot_and_rewind_round_trip_via_vfs() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "echo before > /tmp/notes.txt").await;

    let mut story = samwise_shell::story::Story::new();
    let id = {
        let mut vfs = system.vfs.lock().unwrap();
        story.save(&mut vfs, "checkpoint", 42)
    };
    run(&system, &mut session, "echo after > /tmp/notes.txt").await;
    {
        let mut vfs = system.vfs.lock().unwrap();
        story.rewind(&mut vfs, &id).unwrap();
    }
    let restored = run(&system, &mut session, "cat /tmp/notes.txt").await;
    assert_eq!(restored, "before");
}

#[tokio::test]
async fn story_command_saves_logs_and_rewinds() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "echo before > /tmp/notes.txt").await;
    let save_out = run(&system, &mut session, "story save checkpoint").await;
    assert!(save_out.starts_with("snapshot "));
    run(&system, &mut session, "echo after > /tmp/notes.txt").await;

    let log_out = run(&system, &mut session, "story log").await;
    let id = log_out.split_whitespace().next().expect("log has an id").to_string();
    assert!(log_out.contains("checkpoint"));

    run(&system, &mut session, &format!("story rewind {} --confirmed", id)).await;
    let restored = run(&system, &mut session, "cat /tmp/notes.txt").await;
    assert_eq!(restored, "before");
}

#[tokio::test]
async fn base64_and_xor_round_trip() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    let encoded = run(&system, &mut session, "echo hello | base64").await;
    let decoded = run(&system, &mut session, &format!("echo {} | base64 -d", encoded)).await;
    assert_eq!(decoded, "hello");

    let ciphertext = run(&system, &mut session, "echo secret | xor k").await;
    let plaintext = run(&system, &mut session, &format!("echo {} | xor -d k", ciphertext)).await;
    assert_eq!(plaintext, "secret");
}

#[tokio::test]
async fn background_job_can_be_stopped_and_continued() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    let pid = session.jobs.spawn("sleep 100", "root");
    run(&system, &mut session, &format!("kill -STOP {}", pid)).await;
    assert_eq!(session.jobs.get(pid).unwrap().status, samwise_shell::session::jobs::JobStatus::Stopped);
    run(&system, &mut session, &format!("bg {}", pid)).await;
    assert_eq!(session.jobs.get(pid).unwrap().status, samwise_shell::session::jobs::JobStatus::Running);
}

#[tokio::test]
async fn find_matches_by_name_and_deletes() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "mkdir -p /tmp/findtest").await;
    run(&system, &mut session, "cd /tmp/findtest").await;
    run(&system, &mut session, "touch keep.txt drop.log").await;
    let listing = run(&system, &mut session, "find . -name *.txt").await;
    assert!(listing.contains("keep.txt"));
    assert!(!listing.contains("drop.log"));

    run(&system, &mut session, "find . -name *.log -delete").await;
    let after = run(&system, &mut session, "ls").await;
    assert!(!after.contains("drop.log"));
    assert!(after.contains("keep.txt"));
}

#[tokio::test]
async fn cut_and_tr_process_fields_and_characters() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    let fields = run(&system, &mut session, "echo a:b:c | cut -d : -f 2").await;
    assert_eq!(fields, "b");

    let upper = run(&system, &mut session, "echo hello | tr a-z A-Z").await;
    assert_eq!(upper, "HELLO");
}

#[tokio::test]
async fn sed_substitutes_with_backreferences() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    let out = run(&system, &mut session, r#"echo "foo bar" | sed 's/(\w+) (\w+)/\2 \1/'"#).await;
    assert_eq!(out, "bar foo");
}

#[tokio::test]
async fn df_reports_usage_against_configured_ceiling() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    let out = run(&system, &mut session, "df").await;
    assert!(out.contains("samwisefs"));
    assert!(out.contains("Use%"));
}

#[tokio::test]
async fn reset_requires_confirmation_before_wiping_the_tree() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "touch /tmp/marker.txt").await;
    // Without --confirmed, reset only asks --- it must not wipe anything.
    run(&system, &mut session, "reset").await;
    let still_there = run(&system, &mut session, "ls /tmp").await;
    assert!(still_there.contains("marker.txt"));

    run(&system, &mut session, "reset --confirmed").await;
    let err = run_err(&system, &mut session, "cat /tmp/marker.txt").await;
    assert_eq!(err.kind, samwise_shell::error::ErrorKind::NotFound);
}

#[tokio::test]
async fn run_script_parses_lines_without_executing_them() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    run(&system, &mut session, "echo 'echo one' > /tmp/script.sh").await;
    run(&system, &mut session, "echo 'echo two' >> /tmp/script.sh").await;
    // `run` hands back a script for the host to re-enter the executor with,
    // it never runs `echo one`/`echo two` itself --- stdout stays empty.
    let out = run(&system, &mut session, "run /tmp/script.sh").await;
    assert_eq!(out, "");
}

#[tokio::test]
async fn who_and_uptime_report_session_state() {
    let system = SystemContext::new();
    let mut session = system.new_session("root");
    let who_out = run(&system, &mut session, "who").await;
    assert!(who_out.contains("root"));
    let uptime_out = run(&system, &mut session, "uptime").await;
    assert!(uptime_out.starts_with("up "));
}
