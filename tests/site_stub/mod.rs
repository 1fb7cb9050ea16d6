use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const CLASSES_JSON: &str = r#"[
  {
    "date": "2025-12-08",
    "class": true,
    "class_name": "Lesson 3: Greetings",
    "covered_in_class": "Saying hello and goodbye",
    "homework": "https://example.com/hw3",
    "homework_due": "2025-12-10",
    "notes_contents": [{ "label": "Slides", "url": "https://example.com/slides3" }]
  },
  {
    "date": "2025-12-10",
    "class": false,
    "class_name": "",
    "covered_in_class": "Winter holiday"
  },
  {
    "date": "2025-12-01",
    "class": true,
    "class_name": "Lesson 2: Letters",
    "covered_in_class": "Letters A-D"
  }
]"#;

pub const RESOURCES_JSON: &str = r#"[
  { "title": "Alphabet Song", "description": "Sing the letters", "url": "https://example.com/song", "tags": ["letters", "video"] },
  { "title": "Number Drills", "description": "Count to ten", "url": "https://example.com/numbers", "tags": ["numbers", "worksheet"] },
  { "title": "Letter Tracing", "description": "Practice writing", "url": "https://example.com/tracing", "tags": ["letters", "worksheet"] }
]"#;

pub const STUDENTS_JSON: &str = r#"[
  { "first_name": "Lina", "last_name": "Haddad", "dob": "2012-03-04" },
  { "first_name": "Omar", "last_name": "Saleh", "dob": "2011-11-30" },
  { "first_name": "Sami", "last_name": "Nasser", "dob": "2012-01-15" }
]"#;

pub const GRADING_JSON: &str = r#"{
  "weights": { "attendance": 0.1, "homework": 0.2, "quiz": 0.3, "test": 0.4 },
  "scale": [
    { "min": 0.0, "label": "P", "description": "Progressing" },
    { "min": 0.9, "label": "E", "description": "Exceeding" },
    { "min": 0.75, "label": "M", "description": "Meeting" }
  ]
}"#;

pub const GRADES_CSV: &str = "\
,12/1/2025,12/2/2025,12/3/2025,12/4/2025,12/5/2025,12/8/2025\r
Type,Attendance,Quiz,Homework,Test,Project,Quiz\r
Title,Day 1,Letters quiz,Worksheet 1,Unit test,Poster,Hidden quiz\r
Include,TRUE,TRUE,TRUE,TRUE,TRUE,FALSE\r
Omar Saleh (2B),N,70,P,60,M,100\r
Lina Haddad (2A),Y,88,E,excused,M,100\r
";

pub const COMMENTS_CSV: &str = "\
Student Name,Date,Comment
Lina Haddad,12/3/2025,\"Great focus, keep it up\"
Omar Saleh,12/3/2025,Needs to practice letters
";

/// Serves fixed bodies by path (query strings ignored); anything else is a 404.
pub struct SiteStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SiteStub {
    /// The full classroom site: data files plus both published sheets.
    pub fn classroom() -> Self {
        Self::spawn(&[
            ("/data/classes.json", CLASSES_JSON),
            ("/data/resources.json", RESOURCES_JSON),
            ("/data/students.json", STUDENTS_JSON),
            ("/data/grading.json", GRADING_JSON),
            ("/sheets/grades.csv", GRADES_CSV),
            ("/sheets/comments.csv", COMMENTS_CSV),
        ])
    }

    pub fn spawn(routes: &[(&str, &str)]) -> Self {
        let routes = routes
            .iter()
            .map(|(path, body)| ((*path).to_owned(), (*body).to_owned()))
            .collect::<HashMap<_, _>>();

        let server = tiny_http::Server::http("127.0.0.1:0").expect("start site stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url);
                let response = match routes.get(path) {
                    Some(body) => tiny_http::Response::from_string(body.clone()),
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Global flags pointing the CLI at this stub.
    #[allow(dead_code)]
    pub fn site_args(&self) -> Vec<String> {
        vec![
            "--base-url".to_owned(),
            self.base_url.clone(),
            "--grades-sheet-url".to_owned(),
            self.url("sheets/grades.csv?gid=0&output=csv"),
            "--comments-sheet-url".to_owned(),
            self.url("sheets/comments.csv?gid=1&output=csv"),
        ]
    }
}

impl Drop for SiteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
