// mentor-room CLI validation tool
// Exercises a running room server over HTTP and WebSocket

use clap::{Parser, Subcommand};
use colored::*;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::io::{self, Write};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use mentor_room::rooms::{ChatMessage, ServerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_WAIT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "mentor-room-cli")]
#[command(about = "mentor-room CLI Validation Tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:5000)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Show live room and connection counts
    Stats,

    /// Test WebSocket connection
    Connect,

    /// Join a room and print what the server sends
    Join {
        /// Room ID to join
        #[arg(short, long)]
        room_id: String,

        /// Chat message to send after joining
        #[arg(short, long)]
        message: Option<String>,

        /// Code to publish after joining
        #[arg(short, long)]
        code: Option<String>,

        /// Keep connection alive (press Ctrl+C to exit)
        #[arg(short, long)]
        keep_alive: bool,
    },

    /// Run automated validation scenarios
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(short, long)]
        scenario: Option<String>,
    },

    /// Interactive mode - send custom messages
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => check_health(&cli.server).await,
        Commands::Stats => check_stats(&cli.server).await,
        Commands::Connect => test_connection(&cli.server).await,
        Commands::Join {
            room_id,
            message,
            code,
            keep_alive,
        } => {
            join_room(&cli.server, room_id, message.as_deref(), code.as_deref(), *keep_alive).await;
        }
        Commands::Validate { all, scenario } => {
            if *all {
                run_all_validations(&cli.server).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
        Commands::Interactive => interactive_mode(&cli.server).await,
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/health", server);
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            println!("{} Health check passed", "✓".green());
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
            }
        }
        Ok(resp) => println!("{} Health check failed: {}", "✗".red(), resp.status()),
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn check_stats(server: &str) {
    let url = format!("http://{}/stats", server);
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
            Ok(body) => {
                println!("  Rooms: {}", body["rooms"]);
                println!("  Connections: {}", body["connections"]);
            }
            Err(e) => println!("{} Unreadable stats: {}", "✗".red(), e),
        },
        Ok(resp) => println!("{} Stats fetch failed: {}", "✗".red(), resp.status()),
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn test_connection(server: &str) {
    println!("{}", "Testing WebSocket connection...".cyan());

    let url = ws_url(server);
    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection established", "✓".green());
            println!("  URL: {}", url);
            drop(ws_stream);
            println!("{} Connection closed cleanly", "✓".green());
        }
        Err(e) => println!("{} WebSocket connection failed: {}", "✗".red(), e),
    }
}

async fn join_room(
    server: &str,
    room_id: &str,
    message: Option<&str>,
    code: Option<&str>,
    keep_alive: bool,
) {
    println!("{}", "Joining room...".cyan());
    println!("  Room ID: {}", room_id);

    let Some(mut ws) = open(server).await else {
        return;
    };
    if !send_event(&mut ws, json!({"event": "joinRoom", "data": {"roomId": room_id}})).await {
        println!("{} Failed to send joinRoom", "✗".red());
        return;
    }

    let mut role = None;
    while let Some(event) = next_event(&mut ws, EVENT_WAIT).await {
        print_event(&event);
        if let ServerEvent::AssignRole(assigned) = &event {
            role = Some(assigned.clone());
        }
        if matches!(event, ServerEvent::StudentCount(_)) {
            break;
        }
    }

    let Some(role) = role else {
        println!("{} No role assigned", "✗".red());
        return;
    };

    if let Some(code) = code {
        send_event(&mut ws, json!({"event": "codeChange", "data": {"roomId": room_id, "code": code}})).await;
        println!("{} Code published", "✓".green());
    }
    if let Some(text) = message {
        send_event(
            &mut ws,
            json!({"event": "sendMessage", "data": {"roomId": room_id, "message": text, "sender": role}}),
        )
        .await;
    }

    if !keep_alive {
        while let Some(event) = next_event(&mut ws, EVENT_WAIT).await {
            print_event(&event);
        }
        return;
    }

    println!("Listening for room events (Ctrl+C to exit)...");
    loop {
        tokio::select! {
            event = next_event(&mut ws, Duration::from_secs(3600)) => {
                match event {
                    Some(event) => {
                        print_event(&event);
                        if event == ServerEvent::MentorLeft {
                            println!("{} Room closed by mentor", "!".yellow());
                            break;
                        }
                    }
                    None => {
                        println!("{} Connection closed", "✗".red());
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                send_event(&mut ws, json!({"event": "leaveRoom", "data": {"roomId": room_id}})).await;
                break;
            }
        }
    }
}

fn print_event(event: &ServerEvent) {
    match event {
        ServerEvent::AssignRole(role) => println!("{} Role: {}", "◀".green(), role.bold()),
        ServerEvent::CodeUpdate(code) => println!("{} Code:\n{}", "◀".green(), code.bright_white()),
        ServerEvent::StudentCount(n) => println!("{} Students in room: {}", "◀".green(), n),
        ServerEvent::ChatHistory(history) => {
            println!("{} Chat history ({} messages)", "◀".green(), history.len());
            for entry in history {
                println!("    {}: {}", entry.sender.cyan(), entry.message);
            }
        }
        ServerEvent::ReceiveMessage(ChatMessage { sender, message }) => {
            println!("{} {}: {}", "◀".green(), sender.cyan(), message)
        }
        ServerEvent::MentorLeft => println!("{} Mentor left", "◀".yellow()),
        ServerEvent::Error { message } => println!("{} Error: {}", "◀".red(), message),
    }
}

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    println!("  {} - Basic WebSocket connection test", "connection".cyan());
    println!("  {} - Mentor then numbered students", "roles".cyan());
    println!("  {} - Code edits reach everyone but the author", "code-sync".cyan());
    println!("  {} - Chat is echoed to the whole room", "chat-echo".cyan());
    println!("  {} - Mentor leaving closes the room", "mentor-left".cyan());
    println!("  {} - Chat to an unknown room is reported", "missing-room".cyan());
    println!("  {} - Join without roomId is rejected", "invalid-join".cyan());
    println!("\nExample: mentor-room-cli validate --scenario roles");
}

const SCENARIOS: &[&str] = &[
    "connection",
    "roles",
    "code-sync",
    "chat-echo",
    "mentor-left",
    "missing-room",
    "invalid-join",
];

async fn run_scenario(server: &str, scenario: &str) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let Some(result) = dispatch_scenario(server, scenario).await else {
        println!("{} Unknown scenario: {}", "✗".red(), scenario);
        list_scenarios();
        return;
    };

    if result {
        println!("\n{} Scenario passed", "✓".green().bold());
    } else {
        println!("\n{} Scenario failed", "✗".red().bold());
    }
}

async fn dispatch_scenario(server: &str, scenario: &str) -> Option<bool> {
    let result = match scenario {
        "connection" => validate_connection(server).await,
        "roles" => validate_roles(server).await,
        "code-sync" => validate_code_sync(server).await,
        "chat-echo" => validate_chat_echo(server).await,
        "mentor-left" => validate_mentor_left(server).await,
        "missing-room" => validate_missing_room(server).await,
        "invalid-join" => validate_invalid_join(server).await,
        _ => return None,
    };
    Some(result)
}

async fn run_all_validations(server: &str) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let mut passed = 0;
    for scenario in SCENARIOS {
        println!("{} {}", "▶".cyan(), scenario.bold());
        if dispatch_scenario(server, scenario).await == Some(true) {
            passed += 1;
        }
        sleep(Duration::from_millis(100)).await;
    }

    println!("\n{}", "═".repeat(60).green());
    let summary = format!("{}/{} scenarios passed", passed, SCENARIOS.len());
    if passed == SCENARIOS.len() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

async fn validate_connection(server: &str) -> bool {
    match open(server).await {
        Some(_) => {
            println!("{} Connected", "✓".green());
            true
        }
        None => false,
    }
}

async fn validate_roles(server: &str) -> bool {
    let room = scratch_room();
    let Some((mut mentor, role)) = join_as(server, &room).await else {
        return false;
    };
    if !check(role == "mentor", "first joiner is mentor") {
        return false;
    }

    let mut students = Vec::new();
    for n in 1..=2 {
        let Some((ws, role)) = join_as(server, &room).await else {
            return false;
        };
        if !check(role == format!("Student {}", n), &format!("joiner {} is Student {}", n + 1, n)) {
            return false;
        }
        students.push(ws);
        if !check(
            wait_for(&mut mentor, |e| *e == ServerEvent::StudentCount(n)).await,
            &format!("mentor sees {} student(s)", n),
        ) {
            return false;
        }
    }
    true
}

async fn validate_code_sync(server: &str) -> bool {
    let room = scratch_room();
    let Some((mut mentor, _)) = join_as(server, &room).await else {
        return false;
    };
    let Some((mut student, _)) = join_as(server, &room).await else {
        return false;
    };

    let code = "function add(a, b) { return a + b; }";
    send_event(&mut student, json!({"event": "codeChange", "data": {"roomId": room, "code": code}})).await;

    let mentor_saw = wait_for(&mut mentor, |e| *e == ServerEvent::CodeUpdate(code.to_string())).await;
    let echoed = wait_for(&mut student, |e| matches!(e, ServerEvent::CodeUpdate(_))).await;

    let Some(mut late) = open(server).await else {
        return false;
    };
    send_event(&mut late, json!({"event": "joinRoom", "data": {"roomId": room}})).await;
    let late_saw = wait_for(&mut late, |e| *e == ServerEvent::CodeUpdate(code.to_string())).await;

    check(mentor_saw, "mentor received the edit")
        && check(!echoed, "author did not get an echo")
        && check(late_saw, "late joiner got the latest code")
}

async fn validate_chat_echo(server: &str) -> bool {
    let room = scratch_room();
    let Some((mut mentor, _)) = join_as(server, &room).await else {
        return false;
    };
    let Some((mut student, role)) = join_as(server, &room).await else {
        return false;
    };

    send_event(
        &mut student,
        json!({"event": "sendMessage", "data": {"roomId": room, "message": "hi", "sender": role}}),
    )
    .await;

    let expected = ServerEvent::ReceiveMessage(ChatMessage {
        sender: role,
        message: "hi".to_string(),
    });
    let to_mentor = wait_for(&mut mentor, |e| *e == expected).await;
    let to_sender = wait_for(&mut student, |e| *e == expected).await;
    check(to_mentor, "mentor received the message") && check(to_sender, "sender received its echo")
}

async fn validate_mentor_left(server: &str) -> bool {
    let room = scratch_room();
    let Some((mentor, _)) = join_as(server, &room).await else {
        return false;
    };
    let Some((mut student, _)) = join_as(server, &room).await else {
        return false;
    };

    drop(mentor);
    if !check(
        wait_for(&mut student, |e| *e == ServerEvent::MentorLeft).await,
        "student told the mentor left",
    ) {
        return false;
    }

    match join_as(server, &room).await {
        Some((_, role)) => check(role == "mentor", "next joiner opens a fresh room as mentor"),
        None => false,
    }
}

async fn validate_missing_room(server: &str) -> bool {
    let Some(mut ws) = open(server).await else {
        return false;
    };
    send_event(
        &mut ws,
        json!({"event": "sendMessage", "data": {"roomId": scratch_room(), "message": "anyone?", "sender": "Student 1"}}),
    )
    .await;
    check(
        wait_for(&mut ws, |e| matches!(e, ServerEvent::Error { .. })).await,
        "error reported for unknown room",
    )
}

async fn validate_invalid_join(server: &str) -> bool {
    let Some(mut ws) = open(server).await else {
        return false;
    };
    send_event(&mut ws, json!({"event": "joinRoom", "data": {}})).await;

    let reported = wait_for(&mut ws, |e| matches!(e, ServerEvent::Error { .. })).await;
    let closed = matches!(
        timeout(EVENT_WAIT, ws.next()).await,
        Ok(None) | Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_)))
    );
    check(reported, "error reported") && check(closed, "connection closed by server")
}

fn check(ok: bool, what: &str) -> bool {
    if ok {
        println!("  {} {}", "✓".green(), what);
    } else {
        println!("  {} {}", "✗".red(), what);
    }
    ok
}

fn scratch_room() -> String {
    format!("cli-{:08x}", rand::random::<u32>())
}

fn ws_url(server: &str) -> String {
    format!("ws://{}/ws", server)
}

async fn open(server: &str) -> Option<WsStream> {
    match connect_async(ws_url(server)).await {
        Ok((ws, _)) => Some(ws),
        Err(e) => {
            println!("{} Cannot connect: {}", "✗".red(), e);
            None
        }
    }
}

async fn send_event(ws: &mut WsStream, event: serde_json::Value) -> bool {
    ws.send(Message::Text(event.to_string())).await.is_ok()
}

async fn next_event(ws: &mut WsStream, wait: Duration) -> Option<ServerEvent> {
    loop {
        match timeout(wait, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str(&text) {
                Ok(event) => return Some(event),
                Err(e) => println!("{} Unreadable event {}: {}", "?".yellow(), text, e),
            },
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) | Err(_) => return None,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// Read events until one matches or the stream goes quiet.
async fn wait_for(ws: &mut WsStream, wanted: impl Fn(&ServerEvent) -> bool) -> bool {
    while let Some(event) = next_event(ws, EVENT_WAIT).await {
        if wanted(&event) {
            return true;
        }
    }
    false
}

/// Join `room` and return the socket with the assigned role, once the
/// join burst has been consumed.
async fn join_as(server: &str, room: &str) -> Option<(WsStream, String)> {
    let mut ws = open(server).await?;
    if !send_event(&mut ws, json!({"event": "joinRoom", "data": {"roomId": room}})).await {
        return None;
    }

    let mut role = None;
    while let Some(event) = next_event(&mut ws, EVENT_WAIT).await {
        match event {
            ServerEvent::AssignRole(assigned) => role = Some(assigned),
            ServerEvent::StudentCount(_) => break,
            _ => {}
        }
    }
    role.map(|role| (ws, role))
}

async fn interactive_mode(server: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let Some(ws_stream) = open(server).await else {
        return;
    };
    println!("{} Connected to server", "✓".green());

    let (mut write, mut read) = ws_stream.split();

    let receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            if let Message::Text(text) = msg {
                println!("\n{} {}", "◀".green(), text.bright_white());
            }
        }
    });

    loop {
        print!("{} ", "►".cyan());
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }
        if input == "help" {
            print_interactive_help();
            continue;
        }

        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
            if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                println!("{} Message sent", "✓".green());
            } else {
                println!("{} Failed to send message", "✗".red());
                break;
            }
        } else {
            println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
        }
    }

    receive_task.abort();
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send JSON messages directly to the server.\n");

    println!("{}", "Example Messages:".bold());
    println!("\n{}:", "Join Room".cyan());
    println!(r#"  {{"event":"joinRoom","data":{{"roomId":"65a1f0c2"}}}}"#);

    println!("\n{}:", "Code Change".cyan());
    println!(r#"  {{"event":"codeChange","data":{{"roomId":"65a1f0c2","code":"let x = 1;"}}}}"#);

    println!("\n{}:", "Chat".cyan());
    println!(r#"  {{"event":"sendMessage","data":{{"roomId":"65a1f0c2","message":"hi","sender":"Student 1"}}}}"#);

    println!("\n{}:", "Leave".cyan());
    println!(r#"  {{"event":"leaveRoom","data":{{"roomId":"65a1f0c2"}}}}"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}
