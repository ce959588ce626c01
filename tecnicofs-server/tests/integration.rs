//! End-to-end tests that bind a real server socket, issue commands through
//! `tecnicofs_client::Client`, and check the replies. These exercise the
//! wire format in addition to `tecnicofs-core`'s own unit tests, which only
//! ever call `Filesystem` directly.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tecnicofs_client::Client;
use tecnicofs_core::InodeType;
use tecnicofs_server::Args;

fn start_server() -> PathBuf {
    let socket_path = std::env::temp_dir().join(format!(
        "tecnicofs-test-{}-{}.socket",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let args = Args {
        socket: socket_path.clone(),
        threads: 4,
    };
    thread::spawn(move || {
        let _ = tecnicofs_server::run(args);
    });

    // The server binds its socket almost immediately, but there is no
    // signal back to the test when it has. Poll for it rather than
    // sleeping a fixed, possibly-too-short amount.
    for _ in 0..200 {
        if socket_path.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    socket_path
}

#[test]
fn create_lookup_delete_round_trip() {
    let socket = start_server();
    let client = Client::mount(&socket).unwrap();

    client.create("/a.txt", InodeType::File).unwrap();
    assert!(client.lookup("/a.txt").unwrap().is_some());

    client.delete("/a.txt").unwrap();
    assert!(client.lookup("/a.txt").unwrap().is_none());
}

#[test]
fn move_across_directories_over_the_wire() {
    let socket = start_server();
    let client = Client::mount(&socket).unwrap();

    client.create("/src", InodeType::Directory).unwrap();
    client.create("/dst", InodeType::Directory).unwrap();
    client.create("/src/a.txt", InodeType::File).unwrap();

    client.move_("/src/a.txt", "/dst/a.txt").unwrap();

    assert!(client.lookup("/src/a.txt").unwrap().is_none());
    assert!(client.lookup("/dst/a.txt").unwrap().is_some());
}

#[test]
fn print_writes_the_tree_to_a_server_side_file() {
    let socket = start_server();
    let client = Client::mount(&socket).unwrap();

    client.create("/dir", InodeType::Directory).unwrap();
    client.create("/dir/a.txt", InodeType::File).unwrap();

    let out_path = std::env::temp_dir().join(format!(
        "tecnicofs-print-{}-{}.txt",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    client.print(out_path.to_str().unwrap()).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.contains("dir"));
    assert!(contents.contains("a.txt"));
    let _ = std::fs::remove_file(&out_path);
}

#[test]
fn concurrent_moves_sharing_an_ancestor_do_not_deadlock() {
    let socket = start_server();
    let client = Client::mount(&socket).unwrap();

    client.create("/shared", InodeType::Directory).unwrap();
    client.create("/shared/a", InodeType::Directory).unwrap();
    client.create("/shared/b", InodeType::Directory).unwrap();
    client.create("/shared/a/f1.txt", InodeType::File).unwrap();
    client.create("/shared/b/f2.txt", InodeType::File).unwrap();

    let socket_a = socket.clone();
    let socket_b = socket.clone();
    let t1 = thread::spawn(move || {
        let c = Client::mount(&socket_a).unwrap();
        c.move_("/shared/a/f1.txt", "/shared/b/f1.txt").unwrap();
    });
    let t2 = thread::spawn(move || {
        let c = Client::mount(&socket_b).unwrap();
        c.move_("/shared/b/f2.txt", "/shared/a/f2.txt").unwrap();
    });

    t1.join().unwrap();
    t2.join().unwrap();

    assert!(client.lookup("/shared/b/f1.txt").unwrap().is_some());
    assert!(client.lookup("/shared/a/f2.txt").unwrap().is_some());
}
